// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Runtime values.

use std::fmt;
use std::sync::Arc;
use std::thread::ThreadId;

use indexmap::IndexMap;
use loxpp_ast::expr::Expr;
use loxpp_ast::stmt::FnDecl;
use parking_lot::{Condvar, Mutex};

use crate::env::Env;
use crate::interp::{Interpreter, RuntimeDiagnostic};
use crate::natives::net::{Listener, Socket};
use crate::pool::TaskHandle;
use crate::stack;

/// Nesting levels `equals` descends into tuples and dictionaries.
const MAX_EQUALITY_DEPTH: usize = 256;

/// A runtime value in the interpreter.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    /// Boxed, mutable string
    String(Arc<Mutex<String>>),
    Array(Arc<Mutex<Vec<Value>>>),
    /// Immutable
    Tuple(Arc<Vec<Value>>),
    /// String-keyed, insertion ordered
    Dict(Arc<Mutex<IndexMap<String, Value>>>),
    Function(Arc<Closure>),
    Native(Arc<NativeFn>),
    /// Built-in method of an array or string, bound to its receiver
    Method(Arc<BuiltinMethod>),
    Class(Arc<Class>),
    Instance(Arc<Instance>),
    Trait(Arc<Trait>),
    Enum(Arc<Enum>),
    /// Parameterized enum variant, callable to build a record
    Variant(Arc<Variant>),
    Namespace(Arc<Namespace>),
    Lazy(Arc<Thunk>),
    Task(Arc<TaskHandle>),
    /// Host type tag used on the right of `is`
    Type(TypeTag),
    Socket(Arc<Socket>),
    Listener(Arc<Listener>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(Arc::new(Mutex::new(s.into())))
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Arc::new(Mutex::new(items)))
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(Arc::new(items))
    }

    pub fn dict(entries: IndexMap<String, Value>) -> Self {
        Value::Dict(Arc::new(Mutex::new(entries)))
    }

    /// Name reported by `typeof` and in type errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Boolean",
            Value::Number(_) => "Number",
            Value::String(_) => "String",
            Value::Array(_) => "Array",
            Value::Tuple(_) => "Tuple",
            Value::Dict(_) => "Dict",
            Value::Function(_) | Value::Native(_) | Value::Method(_) => "Function",
            Value::Class(_) => "Class",
            Value::Instance(_) => "Instance",
            Value::Trait(_) => "Trait",
            Value::Enum(_) => "Enum",
            Value::Variant(_) => "Variant",
            Value::Namespace(_) => "Namespace",
            Value::Lazy(_) => "Lazy",
            Value::Task(_) => "Task",
            Value::Type(_) => "Type",
            Value::Socket(_) => "Socket",
            Value::Listener(_) => "Listener",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            _ => true,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Copy of the string contents, for string values only.
    pub fn as_string(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.lock().clone()),
            _ => None,
        }
    }

    /// Value equality: primitives and strings by value, tuples and
    /// dictionaries structurally, everything else by identity.
    pub fn equals(&self, other: &Value) -> bool {
        self.equals_within(other, MAX_EQUALITY_DEPTH)
    }

    /// Structural comparison nested deeper than `depth` compares unequal,
    /// which bounds the walk over self-referencing dictionaries.
    fn equals_within(&self, other: &Value, depth: usize) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => {
                if Arc::ptr_eq(a, b) {
                    return true;
                }
                let left = a.lock().clone();
                left == *b.lock()
            }
            (Value::Tuple(a), Value::Tuple(b)) => {
                a.len() == b.len()
                    && depth > 0
                    && a.iter().zip(b.iter()).all(|(x, y)| x.nested_equals(y, depth))
            }
            (Value::Dict(a), Value::Dict(b)) => {
                if Arc::ptr_eq(a, b) {
                    return true;
                }
                if depth == 0 {
                    return false;
                }
                let a = a.lock().clone();
                let b = b.lock().clone();
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|other| v.nested_equals(other, depth)))
            }
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Arc::ptr_eq(a, b),
            (Value::Method(a), Value::Method(b)) => Arc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Arc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Arc::ptr_eq(a, b),
            (Value::Trait(a), Value::Trait(b)) => Arc::ptr_eq(a, b),
            (Value::Enum(a), Value::Enum(b)) => Arc::ptr_eq(a, b),
            (Value::Variant(a), Value::Variant(b)) => Arc::ptr_eq(a, b),
            (Value::Namespace(a), Value::Namespace(b)) => Arc::ptr_eq(a, b),
            (Value::Lazy(a), Value::Lazy(b)) => Arc::ptr_eq(a, b),
            (Value::Task(a), Value::Task(b)) => Arc::ptr_eq(a, b),
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::Socket(a), Value::Socket(b)) => Arc::ptr_eq(a, b),
            (Value::Listener(a), Value::Listener(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn nested_equals(&self, other: &Value, depth: usize) -> bool {
        stack::ensure_sufficient_stack(|| self.equals_within(other, depth - 1))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::String(s) => write!(f, "String({:?})", s.lock()),
            Value::Array(items) => write!(f, "Array(len={})", items.lock().len()),
            Value::Tuple(items) => write!(f, "Tuple(len={})", items.len()),
            Value::Dict(entries) => write!(f, "Dict(len={})", entries.lock().len()),
            Value::Function(c) => write!(f, "Function({})", c.name()),
            Value::Native(n) => write!(f, "Native({})", n.name),
            Value::Method(m) => write!(f, "Method({})", m.name),
            Value::Class(c) => write!(f, "Class({})", c.name),
            Value::Instance(i) => write!(f, "Instance({})", i.class.name),
            Value::Trait(t) => write!(f, "Trait({})", t.name),
            Value::Enum(e) => write!(f, "Enum({})", e.name),
            Value::Variant(v) => write!(f, "Variant({}.{})", v.enum_name, v.name),
            Value::Namespace(ns) => write!(f, "Namespace({})", ns.name),
            other => write!(f, "{}", other.type_name()),
        }
    }
}

/// A user function together with the frame it closes over.
pub struct Closure {
    pub decl: Arc<FnDecl>,
    pub env: Env,
    /// Runs as a class's `init`; calling it yields `self`
    pub is_initializer: bool,
}

impl Closure {
    pub fn new(decl: Arc<FnDecl>, env: Env, is_initializer: bool) -> Arc<Self> {
        Arc::new(Closure {
            decl,
            env,
            is_initializer,
        })
    }

    /// Same function over a new frame defining `self`.
    pub fn bind(&self, receiver: Value) -> Arc<Closure> {
        let env = self.env.child();
        env.define("self", receiver);
        Closure::new(self.decl.clone(), env, self.is_initializer)
    }

    pub fn name(&self) -> &str {
        self.decl.display_name()
    }

    pub fn arity(&self) -> usize {
        self.decl.arity()
    }

    pub fn is_async(&self) -> bool {
        self.decl.is_async
    }

    pub fn is_abstract(&self) -> bool {
        self.decl.is_abstract
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    Variadic,
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Fixed(n) => n == count,
            Arity::Variadic => true,
        }
    }
}

pub type NativeFnPtr = fn(&mut Interpreter, Vec<Value>) -> Result<Value, RuntimeDiagnostic>;

/// A host function registered in the global frame.
pub struct NativeFn {
    pub name: &'static str,
    pub arity: Arity,
    pub func: NativeFnPtr,
}

/// A built-in array or string method bound to its receiver.
pub struct BuiltinMethod {
    pub receiver: Value,
    pub name: &'static str,
}

pub struct Class {
    pub name: String,
    pub superclass: Option<Arc<Class>>,
    /// Own methods plus the default methods merged in from traits
    pub methods: IndexMap<String, Arc<Closure>>,
    pub traits: Vec<Arc<Trait>>,
    /// Holds the static methods; has no superclass and no metaclass of its own
    pub meta: Option<Arc<Class>>,
    /// Static fields set through `Name.field = value`
    pub statics: Mutex<IndexMap<String, Value>>,
}

impl Class {
    pub fn find_method(&self, name: &str) -> Option<Arc<Closure>> {
        match self.methods.get(name) {
            Some(method) => Some(method.clone()),
            None => self.superclass.as_ref()?.find_method(name),
        }
    }

    pub fn static_method(&self, name: &str) -> Option<Arc<Closure>> {
        self.meta.as_ref()?.methods.get(name).cloned()
    }

    /// True when `name` is among the traits of this class, the traits those
    /// compose, or the traits of any superclass.
    pub fn has_trait(&self, name: &str) -> bool {
        self.traits.iter().any(|t| t.composes(name))
            || self
                .superclass
                .as_ref()
                .is_some_and(|superclass| superclass.has_trait(name))
    }

    pub fn is_subclass_of(&self, other: &Class) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        self.superclass
            .as_ref()
            .is_some_and(|superclass| superclass.is_subclass_of(other))
    }

    /// Argument count expected when calling the class.
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }
}

pub struct Instance {
    pub class: Arc<Class>,
    pub fields: Mutex<IndexMap<String, Value>>,
}

impl Instance {
    pub fn new(class: Arc<Class>) -> Arc<Self> {
        Arc::new(Instance {
            class,
            fields: Mutex::new(IndexMap::new()),
        })
    }

    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.lock().get(name).cloned()
    }

    pub fn set_field(&self, name: impl Into<String>, value: Value) {
        self.fields.lock().insert(name.into(), value);
    }
}

pub struct Trait {
    pub name: String,
    /// Methods composed from other traits plus the trait's own
    pub methods: IndexMap<String, Arc<Closure>>,
    pub traits: Vec<Arc<Trait>>,
}

impl Trait {
    /// True for this trait or any trait it composes.
    pub fn composes(&self, name: &str) -> bool {
        self.name == name || self.traits.iter().any(|t| t.composes(name))
    }
}

pub struct Enum {
    pub name: String,
    pub variants: IndexMap<String, Arc<Variant>>,
}

pub struct Variant {
    pub enum_name: String,
    pub name: String,
    pub params: Vec<String>,
}

pub struct Namespace {
    pub name: String,
    pub members: IndexMap<String, Value>,
}

/// An unevaluated expression, forced at most once. A thread that finds
/// another thread mid-evaluation waits on `settled` for its result.
pub struct Thunk {
    pub expr: Arc<Expr>,
    pub env: Env,
    pub state: Mutex<ThunkState>,
    pub settled: Condvar,
}

pub enum ThunkState {
    Pending,
    /// Being evaluated by this thread
    Forcing(ThreadId),
    Done(Value),
}

impl Thunk {
    pub fn new(expr: Arc<Expr>, env: Env) -> Arc<Self> {
        Arc::new(Thunk {
            expr,
            env,
            state: Mutex::new(ThunkState::Pending),
            settled: Condvar::new(),
        })
    }

    pub fn is_forced(&self) -> bool {
        matches!(*self.state.lock(), ThunkState::Done(_))
    }
}

/// Host types that user code can test against with `is`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Number,
    String,
    Boolean,
    Array,
    Tuple,
    Dict,
    Function,
}

impl TypeTag {
    pub const ALL: [TypeTag; 7] = [
        TypeTag::Number,
        TypeTag::String,
        TypeTag::Boolean,
        TypeTag::Array,
        TypeTag::Tuple,
        TypeTag::Dict,
        TypeTag::Function,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Number => "Number",
            TypeTag::String => "String",
            TypeTag::Boolean => "Boolean",
            TypeTag::Array => "Array",
            TypeTag::Tuple => "Tuple",
            TypeTag::Dict => "Dict",
            TypeTag::Function => "Function",
        }
    }

    pub fn matches(self, value: &Value) -> bool {
        self.name() == value.type_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::string("").is_truthy());
    }

    #[test]
    fn strings_compare_by_content() {
        assert!(Value::string("a").equals(&Value::string("a")));
        assert!(!Value::string("a").equals(&Value::string("b")));
    }

    #[test]
    fn tuples_and_dicts_compare_structurally() {
        let t1 = Value::tuple(vec![Value::Number(1.0), Value::string("x")]);
        let t2 = Value::tuple(vec![Value::Number(1.0), Value::string("x")]);
        assert!(t1.equals(&t2));

        let mut a = IndexMap::new();
        a.insert("k".to_string(), Value::Number(1.0));
        let mut b = IndexMap::new();
        b.insert("k".to_string(), Value::Number(1.0));
        assert!(Value::dict(a).equals(&Value::dict(b)));
    }

    #[test]
    fn arrays_compare_by_identity() {
        let a = Value::array(vec![Value::Number(1.0)]);
        let b = Value::array(vec![Value::Number(1.0)]);
        assert!(!a.equals(&b));
        assert!(a.equals(&a.clone()));
    }

    #[test]
    fn type_tags_match_values() {
        assert!(TypeTag::Number.matches(&Value::Number(2.0)));
        assert!(TypeTag::Tuple.matches(&Value::tuple(vec![])));
        assert!(!TypeTag::String.matches(&Value::Null));
    }

    #[test]
    fn self_referencing_dicts_compare_without_recursing_forever() {
        let cyclic = || {
            let dict = Value::dict(IndexMap::new());
            if let Value::Dict(entries) = &dict {
                entries.lock().insert("me".to_string(), dict.clone());
            }
            dict
        };
        let (a, b) = (cyclic(), cyclic());
        assert!(a.equals(&a));
        assert!(!a.equals(&b));
    }

    #[test]
    fn opposite_order_comparisons_do_not_deadlock() {
        let a = Value::string("same");
        let b = Value::string("same");
        let mut x = IndexMap::new();
        x.insert("k".to_string(), a.clone());
        let mut y = IndexMap::new();
        y.insert("k".to_string(), b.clone());
        let (x, y) = (Value::dict(x), Value::dict(y));

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..10_000 {
                    assert!(a.equals(&b));
                    assert!(x.equals(&y));
                }
            });
            scope.spawn(|| {
                for _ in 0..10_000 {
                    assert!(b.equals(&a));
                    assert!(y.equals(&x));
                }
            });
        });
    }
}
