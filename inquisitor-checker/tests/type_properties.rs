//! Property-based tests for the compatibility relation and overload resolution.

use std::collections::BTreeSet;

use inquisitor_checker::{fits, resolve, FuncType, Type};
use proptest::prelude::*;

/// Strategy for atomic types, including the None type and the unknown type.
fn leaf_type() -> impl Strategy<Value = Type> {
    prop_oneof![
        Just(Type::int()),
        Just(Type::float()),
        Just(Type::complex()),
        Just(Type::str()),
        Just(Type::bytes()),
        Just(Type::bool()),
        Just(Type::none()),
        Just(Type::Unknown),
        "[A-Z][a-z]{1,6}".prop_map(Type::primitive),
    ]
}

/// Strategy for arbitrary nested types.
fn any_type() -> impl Strategy<Value = Type> {
    leaf_type().prop_recursive(4, 24, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(Type::list),
            Just(Type::empty_list()),
            (inner.clone(), inner.clone()).prop_map(|(key, value)| Type::dict(key, value)),
            Just(Type::empty_dict()),
            inner.clone().prop_filter_map("Maybe(None) is invalid", |ty| Type::maybe(ty).ok()),
            prop::collection::vec(inner.clone(), 1..4).prop_map(Type::union),
            (prop::collection::vec(inner.clone(), 0..3), inner)
                .prop_map(|(params, ret)| Type::func(params, ret)),
        ]
    })
}

fn signature() -> impl Strategy<Value = FuncType> {
    (prop::collection::vec(leaf_type(), 0..3), leaf_type())
        .prop_map(|(params, ret)| FuncType::new(params, ret))
}

proptest! {
    #[test]
    fn fits_is_reflexive(ty in any_type()) {
        prop_assert!(fits(&ty, &ty), "{} should fit itself", ty);
    }

    #[test]
    fn unknown_accepts_everything(ty in any_type()) {
        prop_assert!(fits(&ty, &Type::Unknown));
    }

    #[test]
    fn empty_list_fits_and_is_fit_by_every_list(element in any_type()) {
        let list = Type::list(element);
        prop_assert!(fits(&Type::empty_list(), &list));
        prop_assert!(fits(&list, &Type::empty_list()));
    }

    #[test]
    fn empty_dict_fits_and_is_fit_by_every_dict(key in any_type(), value in any_type()) {
        let dict = Type::dict(key, value);
        prop_assert!(fits(&Type::empty_dict(), &dict));
        prop_assert!(fits(&dict, &Type::empty_dict()));
    }

    #[test]
    fn maybe_accepts_none_and_whatever_its_concrete_type_accepts(
        concrete in any_type(),
        candidate in any_type(),
    ) {
        if let Ok(maybe) = Type::maybe(concrete.clone()) {
            prop_assert!(fits(&Type::none(), &maybe));
            if fits(&candidate, &concrete) {
                prop_assert!(fits(&candidate, &maybe));
            }
        } else {
            prop_assert!(concrete.is_none());
        }
    }

    #[test]
    fn union_target_accepts_each_member(members in prop::collection::vec(any_type(), 1..4)) {
        let union = Type::union(members.clone());
        for member in &members {
            prop_assert!(fits(member, &union), "{} should fit {}", member, union);
        }
    }

    #[test]
    fn resolution_is_deterministic_and_sound(
        signatures in prop::collection::btree_set(signature(), 1..5),
        arguments in prop::collection::vec(leaf_type(), 0..3),
    ) {
        let first = resolve(&signatures, &arguments);
        let second = resolve(&signatures, &arguments);
        prop_assert_eq!(&first, &second);

        let accepting: BTreeSet<Type> = signatures
            .iter()
            .filter(|signature| signature.accepts(&arguments))
            .map(|signature| (*signature.ret).clone())
            .collect();
        match first {
            Ok(result) => {
                prop_assert!(!accepting.is_empty());
                prop_assert_eq!(result, Type::union(accepting));
            }
            Err(_) => prop_assert!(accepting.is_empty()),
        }
    }
}
