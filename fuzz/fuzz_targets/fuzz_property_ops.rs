#![no_main]

use libfuzzer_sys::fuzz_target;
use jsobject::{
    IntegrityLevel, JsObjectRef, JsValue, PropertyAttributes, PropertyDescriptor, PropertyKey,
    Realm, RealmConfig, ShouldThrowExceptions,
};

const NAMES: [&str; 6] = ["a", "b", "length", "0", "4294967295", "-0"];

fn key_for(realm: &mut Realm, byte: u8) -> PropertyKey {
    match byte % 8 {
        0..=5 => PropertyKey::from(NAMES[(byte % 8) as usize]),
        6 => PropertyKey::Index(u32::from(byte >> 3)),
        _ => PropertyKey::Symbol(realm.well_known_symbols().iterator.clone()),
    }
}

fn pick(objects: &[JsObjectRef], byte: u8) -> &JsObjectRef {
    &objects[byte as usize % objects.len()]
}

fuzz_target!(|data: &[u8]| {
    // Limit input size to avoid timeout
    if data.len() > 4096 {
        return;
    }

    let mut realm = Realm::with_config(RealmConfig {
        gc_threshold: 16,
        max_recursion_depth: 64,
        max_shared_shape_properties: 4,
    });
    let plain = realm.create_plain_object();
    let array = realm.create_array(vec![JsValue::Null; 3]);
    let child = realm.create_object(Some(plain.clone()));
    let mut objects = vec![plain, array, child];

    for chunk in data.chunks_exact(4) {
        let (op, target, key_byte, arg) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        let obj = pick(&objects, target).clone();
        let key = key_for(&mut realm, key_byte);
        let value = JsValue::Number(f64::from(arg));

        match op % 10 {
            0 => {
                let _ = obj.set(&mut realm, &key, value, ShouldThrowExceptions::No);
            }
            1 => {
                let _ = obj.get(&mut realm, &key);
            }
            2 => {
                let _ = obj.internal_delete(&mut realm, &key);
            }
            3 => {
                let attributes = PropertyAttributes::new(arg & 1 != 0, arg & 2 != 0, arg & 4 != 0);
                let desc = PropertyDescriptor::data(value, attributes);
                let _ = obj.internal_define_own_property(&mut realm, &key, &desc, None);
            }
            4 => {
                let level = if arg & 1 == 0 {
                    IntegrityLevel::Sealed
                } else {
                    IntegrityLevel::Frozen
                };
                if let Ok(true) = obj.set_integrity_level(&mut realm, level) {
                    assert_eq!(obj.test_integrity_level(&mut realm, level).ok(), Some(true));
                }
            }
            5 => {
                let proto = pick(&objects, arg).clone();
                let _ = obj.internal_set_prototype_of(&mut realm, Some(proto));
            }
            6 => {
                if let Ok(keys) = obj.own_property_keys(&mut realm) {
                    // Integer keys come first, ascending
                    let indices: Vec<u32> = keys.iter().map_while(PropertyKey::as_index).collect();
                    assert!(indices.windows(2).all(|w| w[0] < w[1]));
                    assert!(keys.iter().skip(indices.len()).all(|k| k.as_index().is_none()));
                }
            }
            7 => {
                let _ = obj.enumerate_object_properties(&mut realm, |_, _| Ok(()));
            }
            8 => {
                if objects.len() < 16 {
                    let created = realm.create_object(Some(obj));
                    objects.push(created);
                }
            }
            _ => {
                realm.collect_garbage();
            }
        }
    }
});
