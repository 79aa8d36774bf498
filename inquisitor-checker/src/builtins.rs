use std::collections::BTreeMap;

use crate::types::{FuncType, Type};

/// Operator methods per primitive type and the globals seeded into the root scope.
#[derive(Debug, Clone, Default)]
pub struct Builtins {
    operators: BTreeMap<String, BTreeMap<String, Type>>,
    globals: BTreeMap<String, Type>,
}

impl Builtins {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn standard() -> Self {
        let mut builtins = Self::empty();

        let int_arithmetic = Type::overload([
            FuncType::new(vec![Type::int(), Type::int()], Type::int()),
            FuncType::new(vec![Type::int(), Type::float()], Type::float()),
            FuncType::new(vec![Type::int(), Type::complex()], Type::complex()),
        ]);
        for method in ["__add__", "__mul__"] {
            builtins.register_operator("int", method, int_arithmetic.clone());
        }

        let float_arithmetic = Type::overload([
            FuncType::new(vec![Type::float(), Type::float()], Type::float()),
            FuncType::new(vec![Type::float(), Type::int()], Type::float()),
        ]);
        for method in ["__add__", "__mul__"] {
            builtins.register_operator("float", method, float_arithmetic.clone());
        }

        let complex_arithmetic = Type::func(vec![Type::complex(), Type::complex()], Type::complex());
        for method in ["__add__", "__mul__"] {
            builtins.register_operator("complex", method, complex_arithmetic.clone());
        }

        builtins.register_operator(
            "str",
            "__add__",
            Type::func(vec![Type::str(), Type::str()], Type::str()),
        );
        builtins.register_operator(
            "str",
            "__mul__",
            Type::func(vec![Type::str(), Type::int()], Type::str()),
        );

        for name in ["int", "float", "str", "bool"] {
            builtins.register_global(name, constructor(Type::primitive(name)));
        }
        builtins.register_global("print", Type::func(vec![Type::Unknown], Type::none()));
        builtins.register_global(
            "len",
            Type::overload([
                FuncType::new(vec![Type::empty_list()], Type::int()),
                FuncType::new(vec![Type::empty_dict()], Type::int()),
                FuncType::new(vec![Type::str()], Type::int()),
            ]),
        );

        builtins
    }

    pub fn register_operator(&mut self, type_name: &str, method: &str, signature: Type) {
        self.operators
            .entry(type_name.to_string())
            .or_default()
            .insert(method.to_string(), signature);
    }

    pub fn register_global(&mut self, name: &str, ty: Type) {
        self.globals.insert(name.to_string(), ty);
    }

    /// Whether the table knows any method of `type_name` at all.
    pub fn knows_type(&self, type_name: &str) -> bool {
        self.operators.contains_key(type_name)
    }

    pub fn operator(&self, type_name: &str, method: &str) -> Option<&Type> {
        self.operators
            .get(type_name)
            .and_then(|methods| methods.get(method))
    }

    pub fn globals(&self) -> impl Iterator<Item = (&String, &Type)> {
        self.globals.iter()
    }
}

fn constructor(result: Type) -> Type {
    Type::overload([
        FuncType::new(Vec::new(), result.clone()),
        FuncType::new(vec![Type::Unknown], result),
    ])
}
