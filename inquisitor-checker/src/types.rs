use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

pub const NONE_TYPE_NAME: &str = "None";

/// Static type of a value. Closed set; compatibility is decided by [`fits`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Type {
    Primitive(String),
    Unknown,
    Func(FuncType),
    Overload(BTreeSet<FuncType>),
    /// `None` is the "no element observed" marker of an empty literal.
    List(Option<Box<Type>>),
    /// Key and value markers are set jointly.
    Dict(Option<(Box<Type>, Box<Type>)>),
    Maybe(Box<Type>),
    Union(BTreeSet<Type>),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FuncType {
    pub params: Vec<Type>,
    /// Names of `params`; empty for builtin signatures.
    pub param_names: Vec<String>,
    pub ret: Box<Type>,
    /// Parameters that carry a default value, in declaration order.
    pub kwargs: Vec<(String, Type)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeModelError {
    #[error("'Maybe' cannot wrap the None type")]
    MaybeOfNone,
    #[error("no overload matches ({})", format_list(.arguments))]
    NoMatchingOverload { arguments: Vec<Type> },
    #[error("'{callee}' is not callable")]
    NotCallable { callee: Type },
}

impl FuncType {
    pub fn new(params: Vec<Type>, ret: Type) -> Self {
        Self {
            params,
            param_names: Vec::new(),
            ret: Box::new(ret),
            kwargs: Vec::new(),
        }
    }

    pub fn with_kwargs(params: Vec<Type>, kwargs: Vec<(String, Type)>, ret: Type) -> Self {
        Self {
            params,
            param_names: Vec::new(),
            ret: Box::new(ret),
            kwargs,
        }
    }

    pub fn named(mut self, param_names: Vec<String>) -> Self {
        self.param_names = param_names;
        self
    }

    /// Slot index of a parameter that may be passed by keyword.
    pub fn keyword_slot(&self, name: &str) -> Option<usize> {
        self.param_names
            .iter()
            .position(|candidate| candidate == name)
            .or_else(|| {
                self.kwargs
                    .iter()
                    .position(|(candidate, _)| candidate == name)
                    .map(|index| index + self.params.len())
            })
    }

    pub fn max_positional(&self) -> usize {
        self.params.len() + self.kwargs.len()
    }

    /// Declared type of the parameter at `index`, counting kwargs after params.
    pub fn positional(&self, index: usize) -> Option<&Type> {
        if index < self.params.len() {
            self.params.get(index)
        } else {
            self.kwargs
                .get(index - self.params.len())
                .map(|(_, ty)| ty)
        }
    }

    /// True when every positional argument fits its parameter.
    pub fn accepts(&self, arguments: &[Type]) -> bool {
        if arguments.len() < self.params.len() || arguments.len() > self.max_positional() {
            return false;
        }
        arguments.iter().enumerate().all(|(index, argument)| {
            self.positional(index)
                .map(|param| fits(argument, param))
                .unwrap_or(false)
        })
    }

    pub fn with_return(&self, ret: Type) -> Self {
        Self {
            ret: Box::new(ret),
            ..self.clone()
        }
    }
}

impl Type {
    pub fn primitive(name: impl Into<String>) -> Self {
        Type::Primitive(name.into())
    }

    pub fn none() -> Self {
        Type::Primitive(NONE_TYPE_NAME.to_string())
    }

    pub fn int() -> Self {
        Type::primitive("int")
    }

    pub fn float() -> Self {
        Type::primitive("float")
    }

    pub fn complex() -> Self {
        Type::primitive("complex")
    }

    pub fn str() -> Self {
        Type::primitive("str")
    }

    pub fn bytes() -> Self {
        Type::primitive("bytes")
    }

    pub fn bool() -> Self {
        Type::primitive("bool")
    }

    pub fn list(element: Type) -> Self {
        Type::List(Some(Box::new(element)))
    }

    pub fn empty_list() -> Self {
        Type::List(None)
    }

    pub fn dict(key: Type, value: Type) -> Self {
        Type::Dict(Some((Box::new(key), Box::new(value))))
    }

    pub fn empty_dict() -> Self {
        Type::Dict(None)
    }

    pub fn func(params: Vec<Type>, ret: Type) -> Self {
        Type::Func(FuncType::new(params, ret))
    }

    pub fn maybe(concrete: Type) -> Result<Self, TypeModelError> {
        match concrete {
            ty if ty.is_none() => Err(TypeModelError::MaybeOfNone),
            Type::Maybe(inner) => Ok(Type::Maybe(inner)),
            ty => Ok(Type::Maybe(Box::new(ty))),
        }
    }

    /// Builds an ambiguity set. Nested unions are flattened, a single member
    /// degenerates to itself and an empty set yields `Unknown`.
    pub fn union<I>(members: I) -> Self
    where
        I: IntoIterator<Item = Type>,
    {
        let mut set = BTreeSet::new();
        for member in members {
            match member {
                Type::Union(inner) => set.extend(inner),
                other => {
                    set.insert(other);
                }
            }
        }
        match set.len() {
            0 => Type::Unknown,
            1 => set.into_iter().next().unwrap_or(Type::Unknown),
            _ => Type::Union(set),
        }
    }

    pub fn overload<I>(members: I) -> Self
    where
        I: IntoIterator<Item = FuncType>,
    {
        Type::Overload(members.into_iter().collect())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Type::Primitive(name) if name == NONE_TYPE_NAME)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Type::Func(_) | Type::Overload(_))
    }

    pub fn as_func(&self) -> Option<&FuncType> {
        match self {
            Type::Func(func) => Some(func),
            _ => None,
        }
    }

    pub fn primitive_name(&self) -> Option<&str> {
        match self {
            Type::Primitive(name) => Some(name),
            _ => None,
        }
    }
}

/// Decides whether a value of type `subject` may be used where `target` is expected.
///
/// Neither symmetric nor transitive.
pub fn fits(subject: &Type, target: &Type) -> bool {
    if subject == target || matches!(target, Type::Unknown) {
        return true;
    }

    if let Type::Union(members) = subject {
        return members.iter().all(|member| fits(member, target));
    }

    match target {
        Type::Primitive(_) | Type::Unknown => false,
        Type::Func(expected) => match subject {
            Type::Func(actual) => func_fits(actual, expected),
            _ => false,
        },
        Type::Overload(members) => members
            .iter()
            .any(|member| fits(subject, &Type::Func(member.clone()))),
        Type::List(expected) => match (subject, expected) {
            (Type::List(_), None) | (Type::List(None), _) => true,
            (Type::List(Some(actual)), Some(expected)) => fits(actual, expected),
            _ => false,
        },
        Type::Dict(expected) => match (subject, expected) {
            (Type::Dict(_), None) | (Type::Dict(None), _) => true,
            (Type::Dict(Some((actual_key, actual_value))), Some((key, value))) => {
                fits(actual_key, key) && fits(actual_value, value)
            }
            _ => false,
        },
        Type::Maybe(concrete) => subject.is_none() || fits(subject, concrete),
        Type::Union(members) => members.iter().any(|member| fits(subject, member)),
    }
}

fn func_fits(actual: &FuncType, expected: &FuncType) -> bool {
    actual.params.len() == expected.params.len()
        && fits(&actual.ret, &expected.ret)
        && actual
            .params
            .iter()
            .zip(&expected.params)
            .all(|(actual, expected)| fits(actual, expected))
}

/// Resolves a call against a set of signatures.
///
/// Several surviving signatures with distinct returns yield their union.
pub fn resolve(
    signatures: &BTreeSet<FuncType>,
    arguments: &[Type],
) -> Result<Type, TypeModelError> {
    let returns: BTreeSet<Type> = signatures
        .iter()
        .filter(|signature| signature.accepts(arguments))
        .map(|signature| (*signature.ret).clone())
        .collect();

    if returns.is_empty() {
        return Err(TypeModelError::NoMatchingOverload {
            arguments: arguments.to_vec(),
        });
    }
    Ok(Type::union(returns))
}

/// Type of calling `callee` with positional `arguments`.
pub fn call_result(callee: &Type, arguments: &[Type]) -> Result<Type, TypeModelError> {
    match callee {
        Type::Func(func) => resolve(&BTreeSet::from([func.clone()]), arguments),
        Type::Overload(signatures) => resolve(signatures, arguments),
        other => Err(TypeModelError::NotCallable {
            callee: other.clone(),
        }),
    }
}

/// Union used to reconcile the return types of two branches.
pub fn merge(a: Type, b: Type) -> Type {
    Type::union([a, b])
}

pub fn format_list(types: &[Type]) -> String {
    types
        .iter()
        .map(|ty| ty.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.params.iter().map(|ty| ty.to_string()).collect();
        parts.extend(
            self.kwargs
                .iter()
                .map(|(name, ty)| format!("{}={}", name, ty)),
        );
        write!(f, "({}) -> {}", parts.join(", "), self.ret)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(name) => write!(f, "{}", name),
            Type::Unknown => write!(f, "?"),
            Type::Func(func) => write!(f, "{}", func),
            Type::Overload(members) => {
                let rendered: Vec<String> = members.iter().map(|m| m.to_string()).collect();
                write!(f, "overload[{}]", rendered.join(", "))
            }
            Type::List(Some(element)) => write!(f, "[{}]", element),
            Type::List(None) => write!(f, "[]"),
            Type::Dict(Some((key, value))) => write!(f, "{{{}: {}}}", key, value),
            Type::Dict(None) => write!(f, "{{}}"),
            Type::Maybe(inner) => write!(f, "Maybe({})", inner),
            Type::Union(members) => {
                let rendered: Vec<String> = members.iter().map(|m| m.to_string()).collect();
                write!(f, "{}", rendered.join(" | "))
            }
        }
    }
}
