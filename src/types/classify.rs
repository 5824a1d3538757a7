use super::{PrimitiveKind, RecordDescriptor, TypeDescriptor};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kind<'a> {
    Primitive(PrimitiveKind),
    Optional(&'a TypeDescriptor),
    Record(&'a RecordDescriptor),
    List(&'a TypeDescriptor),
    Map(&'a TypeDescriptor, &'a TypeDescriptor),
}

pub fn classify(ty: &TypeDescriptor) -> Kind<'_> {
    match ty {
        TypeDescriptor::Primitive(kind) => Kind::Primitive(*kind),
        TypeDescriptor::Optional(_) | TypeDescriptor::Union(_) if is_optional(ty) => {
            Kind::Optional(unwrap_optional(ty))
        }
        TypeDescriptor::Optional(_) | TypeDescriptor::Union(_) => {
            Kind::Primitive(PrimitiveKind::Unknown)
        }
        TypeDescriptor::Record(rec) => Kind::Record(rec),
        TypeDescriptor::List(elem) => Kind::List(elem),
        TypeDescriptor::Map(k, v) => Kind::Map(k, v),
    }
}

/// Each field of `rec` in declaration order with its own classification.
pub fn classify_fields(rec: &RecordDescriptor) -> Vec<(&str, Kind<'_>)> {
    rec.fields
        .iter()
        .map(|f| (f.name.as_str(), classify(&f.ty)))
        .collect()
}

pub fn is_optional(ty: &TypeDescriptor) -> bool {
    match ty {
        TypeDescriptor::Optional(_) => true,
        TypeDescriptor::Union(members) => none_union_member(members).is_some(),
        _ => false,
    }
}

/// Strips every optional layer (`Optional(T)` or `Union[T, None]`) and
/// returns the non-None member. Non-optional types are returned unchanged.
pub fn unwrap_optional(ty: &TypeDescriptor) -> &TypeDescriptor {
    let mut current = ty;
    loop {
        current = match current {
            TypeDescriptor::Optional(inner) => inner,
            TypeDescriptor::Union(members) => match none_union_member(members) {
                Some(inner) => inner,
                None => return current,
            },
            _ => return current,
        };
    }
}

fn none_union_member(members: &[TypeDescriptor]) -> Option<&TypeDescriptor> {
    if members.len() != 2 {
        return None;
    }
    let is_none = |t: &TypeDescriptor| matches!(t, TypeDescriptor::Primitive(PrimitiveKind::NoneType));
    match (is_none(&members[0]), is_none(&members[1])) {
        (true, false) => Some(&members[1]),
        (false, true) => Some(&members[0]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldDescriptor;

    fn none() -> TypeDescriptor {
        TypeDescriptor::Primitive(PrimitiveKind::NoneType)
    }

    #[test]
    fn test_classify_primitive() {
        assert_eq!(
            classify(&TypeDescriptor::integer()),
            Kind::Primitive(PrimitiveKind::Integer)
        );
    }

    #[test]
    fn test_classify_optional_and_union_are_equivalent() {
        let optional = TypeDescriptor::Optional(Box::new(TypeDescriptor::date()));
        let union = TypeDescriptor::Union(vec![TypeDescriptor::date(), none()]);
        let union_none_first = TypeDescriptor::Union(vec![none(), TypeDescriptor::date()]);

        let date = TypeDescriptor::date();
        let expected = Kind::Optional(&date);
        assert_eq!(classify(&optional), expected);
        assert_eq!(classify(&union), expected);
        assert_eq!(classify(&union_none_first), expected);
    }

    #[test]
    fn test_classify_wide_union_is_unknown() {
        let union = TypeDescriptor::Union(vec![
            TypeDescriptor::integer(),
            TypeDescriptor::string(),
            none(),
        ]);
        assert_eq!(classify(&union), Kind::Primitive(PrimitiveKind::Unknown));
    }

    #[test]
    fn test_classify_union_without_none_is_unknown() {
        let union = TypeDescriptor::Union(vec![TypeDescriptor::integer(), TypeDescriptor::string()]);
        assert_eq!(classify(&union), Kind::Primitive(PrimitiveKind::Unknown));
        assert!(!is_optional(&union));
    }

    #[test]
    fn test_unwrap_optional_is_idempotent() {
        let nested = TypeDescriptor::Optional(Box::new(TypeDescriptor::Union(vec![
            TypeDescriptor::string(),
            none(),
        ])));
        let once = unwrap_optional(&nested);
        assert_eq!(once, &TypeDescriptor::string());
        assert_eq!(unwrap_optional(once), once);
    }

    #[test]
    fn test_unwrap_optional_non_optional_unchanged() {
        let ty = TypeDescriptor::list(TypeDescriptor::integer());
        assert_eq!(unwrap_optional(&ty), &ty);
    }

    #[test]
    fn test_classify_fields_recursive() {
        let address = RecordDescriptor::new(
            "Address",
            vec![FieldDescriptor::new("city", TypeDescriptor::string())],
        );
        let person = RecordDescriptor::new(
            "Person",
            vec![
                FieldDescriptor::new("name", TypeDescriptor::string()),
                FieldDescriptor::new(
                    "address",
                    TypeDescriptor::optional(TypeDescriptor::Record(address.clone())),
                ),
                FieldDescriptor::new(
                    "tags",
                    TypeDescriptor::map(TypeDescriptor::string(), TypeDescriptor::integer()),
                ),
            ],
        );

        let fields = classify_fields(&person);
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0], ("name", Kind::Primitive(PrimitiveKind::String)));
        match fields[1].1 {
            Kind::Optional(inner) => assert_eq!(classify(inner), Kind::Record(&address)),
            other => panic!("Expected optional, got {:?}", other),
        }
        assert!(matches!(fields[2].1, Kind::Map(_, _)));
    }
}
