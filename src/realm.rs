//! The realm: heap, intrinsics and the entry points that create objects.
//!
//! Every object belongs to exactly one realm. The realm owns the heap the
//! object lives in, the root shapes new objects start from, and the few
//! intrinsic prototypes the object model itself needs.

use std::rc::{Rc, Weak};

use crate::config::RealmConfig;
use crate::error::{JsError, JsResult};
use crate::exotic::array::ArrayData;
use crate::exotic::bound_function::BoundFunctionData;
use crate::gc::{GcStats, Guard, Heap, WeakRegistry};
use crate::object::{
    JsObject, NativeFunctionData, ObjectKind, PrivateName, PropertyAttributes, Shape,
};
use crate::string_dict::NameTable;
use crate::value::{JsObjectRef, JsString, JsSymbol, JsValue, PropertyKey};

/// Symbols the object model itself consults
#[derive(Debug, Clone)]
pub struct WellKnownSymbols {
    pub to_primitive: JsSymbol,
    pub to_string_tag: JsSymbol,
    pub iterator: JsSymbol,
}

pub struct Realm {
    heap: Heap<JsObject>,
    config: RealmConfig,
    names: NameTable,

    object_prototype: JsObjectRef,
    function_prototype: JsObjectRef,
    array_prototype: JsObjectRef,
    well_known_symbols: WellKnownSymbols,

    /// Root shape per prototype. Weak: a family's tree stays alive through
    /// the shapes its objects use.
    root_shapes: WeakRegistry<JsObject, Weak<Shape>>,
    null_root_shape: Weak<Shape>,

    next_symbol_id: u64,
    next_private_name_id: u64,
    /// Current depth of nested internal-method calls
    depth: usize,
}

impl Realm {
    pub fn new() -> Self {
        Self::with_config(RealmConfig::default())
    }

    pub fn with_config(config: RealmConfig) -> Self {
        let heap = Heap::with_threshold(config.gc_threshold);

        let object_proto_shape = Shape::new_root(None).fork_for_prototype();
        let object_prototype =
            heap.alloc(JsObject::new(object_proto_shape, ObjectKind::ImmutablePrototype));

        let function_proto_shape = Shape::new_root(Some(object_prototype.clone())).fork_for_prototype();
        let noop: crate::object::NativeFn = Rc::new(|_, _, _| Ok(JsValue::Undefined));
        let function_prototype = heap.alloc(JsObject::new(
            function_proto_shape,
            ObjectKind::NativeFunction(NativeFunctionData { func: noop }),
        ));

        let array_proto_shape = Shape::new_root(Some(object_prototype.clone())).fork_for_prototype();
        let array_prototype = heap.alloc(JsObject::new(
            array_proto_shape,
            ObjectKind::Array(ArrayData::new()),
        ));

        let well_known_symbols = WellKnownSymbols {
            to_primitive: JsSymbol::new(1, Some(JsString::from("Symbol.toPrimitive"))),
            to_string_tag: JsSymbol::new(2, Some(JsString::from("Symbol.toStringTag"))),
            iterator: JsSymbol::new(3, Some(JsString::from("Symbol.iterator"))),
        };

        let mut realm = Self {
            heap,
            config,
            names: NameTable::with_well_known_names(),
            object_prototype,
            function_prototype,
            array_prototype,
            well_known_symbols,
            root_shapes: WeakRegistry::new(),
            null_root_shape: Weak::new(),
            next_symbol_id: 4,
            next_private_name_id: 1,
            depth: 0,
        };
        realm.install_object_prototype_methods();
        realm
    }

    fn install_object_prototype_methods(&mut self) {
        let proto = self.object_prototype.clone();
        let to_string = self.key("toString");
        let value_of = self.key("valueOf");
        let result = proto
            .define_native_function(self, &to_string, 0, object_to_string, PropertyAttributes::HIDDEN)
            .and_then(|_| {
                proto.define_native_function(
                    self,
                    &value_of,
                    0,
                    |_, this, _| Ok(this),
                    PropertyAttributes::HIDDEN,
                )
            });
        if let Err(err) = result {
            log::error!("realm: failed to install Object.prototype methods: {}", err);
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &RealmConfig {
        &self.config
    }

    /// Intern a string, returning a shared JsString
    #[inline]
    pub fn intern(&mut self, s: &str) -> JsString {
        self.names.intern(s)
    }

    /// Property key for `s`, sharing interned storage for named keys
    #[inline]
    pub fn key(&mut self, s: &str) -> PropertyKey {
        self.names.key(s)
    }

    pub fn object_prototype(&self) -> JsObjectRef {
        self.object_prototype.clone()
    }

    pub fn function_prototype(&self) -> JsObjectRef {
        self.function_prototype.clone()
    }

    pub fn array_prototype(&self) -> JsObjectRef {
        self.array_prototype.clone()
    }

    pub fn well_known_symbols(&self) -> &WellKnownSymbols {
        &self.well_known_symbols
    }

    // ========================================================================
    // Object creation
    // ========================================================================

    /// Root shape of the object family whose prototype is `prototype`
    pub fn root_shape(&mut self, prototype: Option<&JsObjectRef>) -> Rc<Shape> {
        match prototype {
            Some(proto) => {
                if let Some(shape) = self.root_shapes.get(proto).and_then(Weak::upgrade) {
                    return shape;
                }
                proto.convert_to_prototype_if_needed();
                let shape = Shape::new_root(Some(proto.clone()));
                self.root_shapes.prune();
                self.root_shapes.insert(proto, Rc::downgrade(&shape));
                shape
            }
            None => {
                if let Some(shape) = self.null_root_shape.upgrade() {
                    return shape;
                }
                let shape = Shape::new_root(None);
                self.null_root_shape = Rc::downgrade(&shape);
                shape
            }
        }
    }

    /// Create an ordinary object with the given prototype
    pub fn create_object(&mut self, prototype: Option<JsObjectRef>) -> JsObjectRef {
        let shape = self.root_shape(prototype.as_ref());
        self.heap.alloc(JsObject::new(shape, ObjectKind::Ordinary))
    }

    /// Create an ordinary object inheriting from Object.prototype
    pub fn create_plain_object(&mut self) -> JsObjectRef {
        let proto = self.object_prototype.clone();
        self.create_object(Some(proto))
    }

    /// Create an object on a shape prepared by the caller, typically one
    /// shared by a whole built-in family.
    pub fn create_with_premade_shape(&mut self, shape: Rc<Shape>, kind: ObjectKind) -> JsObjectRef {
        self.heap.alloc(JsObject::new(shape, kind))
    }

    /// Create an object of `kind` on the root shape for `prototype`
    pub fn create_object_of_kind(
        &mut self,
        prototype: Option<JsObjectRef>,
        kind: ObjectKind,
    ) -> JsObjectRef {
        let shape = self.root_shape(prototype.as_ref());
        self.heap.alloc(JsObject::new(shape, kind))
    }

    /// Create an object whose prototype can never change
    pub fn create_immutable_prototype_object(&mut self, prototype: Option<JsObjectRef>) -> JsObjectRef {
        self.create_object_of_kind(prototype, ObjectKind::ImmutablePrototype)
    }

    /// Create an array holding `elements` with Array.prototype as prototype
    pub fn create_array(&mut self, elements: Vec<JsValue>) -> JsObjectRef {
        let proto = self.array_prototype.clone();
        let array = self.create_object_of_kind(Some(proto), ObjectKind::Array(ArrayData::new()));
        array.set_indexed_property_elements(elements);
        array
    }

    /// Create a native function object with `name` and `length` properties
    pub fn create_native_function(
        &mut self,
        name: &str,
        length: u32,
        func: impl Fn(&mut Realm, JsValue, &[JsValue]) -> JsResult<JsValue> + 'static,
    ) -> JsResult<JsObjectRef> {
        let proto = self.function_prototype.clone();
        let kind = ObjectKind::NativeFunction(NativeFunctionData { func: Rc::new(func) });
        let function = self.create_object_of_kind(Some(proto), kind);
        let length_key = self.key("length");
        let name_key = self.key("name");
        let name = self.intern(name);
        let attributes = PropertyAttributes::new(false, false, true);
        function.define_direct_property(self, &length_key, JsValue::Number(length as f64), attributes)?;
        function.define_direct_property(self, &name_key, JsValue::String(name), attributes)?;
        Ok(function)
    }

    /// BoundFunctionCreate
    pub fn create_bound_function(
        &mut self,
        target: &JsObjectRef,
        bound_this: JsValue,
        bound_args: Vec<JsValue>,
    ) -> JsResult<JsObjectRef> {
        if !target.borrow().is_callable() {
            return Err(JsError::type_error("Bind must be called on a function"));
        }
        let proto = target.internal_get_prototype_of(self)?;
        let kind = ObjectKind::BoundFunction(BoundFunctionData {
            target: target.clone(),
            bound_this,
            bound_args,
        });
        Ok(self.create_object_of_kind(proto, kind))
    }

    /// A symbol no other symbol equals
    pub fn new_symbol(&mut self, description: Option<&str>) -> JsSymbol {
        let id = self.next_symbol_id;
        self.next_symbol_id += 1;
        JsSymbol::new(id, description.map(JsString::from))
    }

    /// A fresh private name for one `#name` declaration
    pub fn new_private_name(&mut self, description: &str) -> PrivateName {
        let id = self.next_private_name_id;
        self.next_private_name_id += 1;
        PrivateName::new(id, self.intern(description))
    }

    // ========================================================================
    // Calls and recursion
    // ========================================================================

    /// Call `callee` with `this` and `args`. Native functions run their host
    /// closure, bound functions forward to their target, callable proxies
    /// run their `apply` trap.
    pub fn call(&mut self, callee: &JsValue, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
        let JsValue::Object(obj) = callee else {
            return Err(JsError::type_error(format!(
                "{} is not a function",
                callee.type_of()
            )));
        };
        self.nested(|realm| realm.call_object(obj, this, args))
    }

    fn call_object(&mut self, obj: &JsObjectRef, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
        enum Callee {
            Native(crate::object::NativeFn),
            Bound(JsObjectRef, JsValue, Vec<JsValue>),
            Proxy,
        }

        let callee = {
            let o = obj.borrow();
            match &o.kind {
                ObjectKind::NativeFunction(data) => Callee::Native(Rc::clone(&data.func)),
                ObjectKind::BoundFunction(data) => Callee::Bound(
                    data.target.clone(),
                    data.bound_this.clone(),
                    data.bound_args.clone(),
                ),
                ObjectKind::Proxy(data) if data.is_callable => Callee::Proxy,
                _ => {
                    return Err(JsError::type_error(format!(
                        "{} is not a function",
                        o.class_name()
                    )));
                }
            }
        };

        match callee {
            Callee::Native(func) => func(self, this, args),
            Callee::Bound(target, bound_this, mut full_args) => {
                full_args.extend_from_slice(args);
                self.call(&JsValue::Object(target), bound_this, &full_args)
            }
            Callee::Proxy => crate::exotic::proxy::proxy_call(self, obj, this, args),
        }
    }

    /// Run `f` one level deeper. Fails with `RecursionLimit` instead of
    /// overflowing the native stack.
    pub fn nested<T>(&mut self, f: impl FnOnce(&mut Realm) -> JsResult<T>) -> JsResult<T> {
        if self.depth >= self.config.max_recursion_depth {
            log::debug!("realm: recursion limit {} reached", self.depth);
            return Err(JsError::recursion_limit(self.depth));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    // ========================================================================
    // Heap
    // ========================================================================

    /// Run a full collection. Returns the number of reclaimed objects.
    pub fn collect_garbage(&mut self) -> usize {
        let collected = self.heap.collect();
        self.root_shapes.prune();
        collected
    }

    pub fn gc_stats(&self) -> GcStats {
        self.heap.stats()
    }

    /// A root set that keeps objects alive while it exists
    pub fn create_guard(&self) -> Guard<JsObject> {
        self.heap.create_guard()
    }

    pub fn set_gc_threshold(&mut self, threshold: usize) {
        self.config.gc_threshold = threshold;
        self.heap.set_gc_threshold(threshold);
    }
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}

/// Object.prototype.toString
fn object_to_string(realm: &mut Realm, this: JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let obj = match &this {
        JsValue::Undefined => return Ok(JsValue::from("[object Undefined]")),
        JsValue::Null => return Ok(JsValue::from("[object Null]")),
        JsValue::Object(obj) => obj.clone(),
        other => {
            let tag = match other {
                JsValue::Boolean(_) => "Boolean",
                JsValue::Number(_) => "Number",
                JsValue::String(_) => "String",
                _ => "Symbol",
            };
            return Ok(JsValue::from(format!("[object {}]", tag)));
        }
    };
    let builtin_tag = {
        let o = obj.borrow();
        match &o.kind {
            ObjectKind::Array(_) => "Array",
            ObjectKind::Arguments(_) => "Arguments",
            ObjectKind::NativeFunction(_) | ObjectKind::BoundFunction(_) => "Function",
            ObjectKind::Proxy(data) if data.is_callable => "Function",
            _ => "Object",
        }
    };
    let tag_key = PropertyKey::Symbol(realm.well_known_symbols.to_string_tag.clone());
    let tag = match obj.get(realm, &tag_key)? {
        JsValue::String(s) => s.to_string(),
        _ => builtin_tag.to_string(),
    };
    Ok(JsValue::from(format!("[object {}]", tag)))
}
