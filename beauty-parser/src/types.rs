//! Static type tags.

use std::fmt;

/// A type tag. `Array`, `List` and `Object` are built by tagging an inner type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// No value. The return type of a void function, or the element type of an empty list.
    None,
    Boolean,
    Number,
    String,
    /// Element type of a list literal whose elements disagree. Never the type of a runtime value.
    Mixed,
    Array(Box<Type>),
    /// Type of a list literal before it is coerced into an `Array`.
    List(Box<Type>),
    /// Placeholder for composite object types, tagged with their template.
    Object(Box<Type>),
}

impl Type {
    pub fn array_of(element: Type) -> Type {
        Type::Array(Box::new(element))
    }

    pub fn list_of(element: Type) -> Type {
        Type::List(Box::new(element))
    }

    pub fn object_of(template: Type) -> Type {
        Type::Object(Box::new(template))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Type::List(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Type::Object(_))
    }

    pub fn array_element(&self) -> Option<&Type> {
        match self {
            Type::Array(element) => Some(element),
            _ => None,
        }
    }

    pub fn list_element(&self) -> Option<&Type> {
        match self {
            Type::List(element) => Some(element),
            _ => None,
        }
    }

    pub fn object_template(&self) -> Option<&Type> {
        match self {
            Type::Object(template) => Some(template),
            _ => None,
        }
    }

    /// Returns `true` for `boolean`, `number` and `string`.
    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Boolean | Type::Number | Type::String)
    }

    /// Returns `true` if a variable of this type can exist at runtime.
    pub fn is_concrete(&self) -> bool {
        match self {
            Type::Boolean | Type::Number | Type::String => true,
            Type::Array(element) => element.is_concrete(),
            Type::None | Type::Mixed | Type::List(_) | Type::Object(_) => false,
        }
    }

    /// The type a list element of type `self` takes once the list is coerced.
    /// Nested list literals become arrays.
    fn as_element(&self) -> Type {
        match self {
            Type::List(element) if **element == Type::None => Type::array_of(Type::None),
            Type::List(element) if **element == Type::Mixed => Type::Mixed,
            Type::List(element) => Type::array_of(element.as_element()),
            other => other.clone(),
        }
    }

    /// Infers the type of a list literal from the types of its elements.
    pub fn of_list_literal<'a>(elements: impl IntoIterator<Item = &'a Type>) -> Type {
        let mut common: Option<Type> = None;
        for element in elements {
            let element = element.as_element();
            common = Some(match common {
                None => element,
                Some(previous) => match Type::merge(&previous, &element) {
                    Some(merged) => merged,
                    None => return Type::list_of(Type::Mixed),
                },
            });
        }
        Type::list_of(common.unwrap_or(Type::None))
    }

    /// The common type of two list elements, if any.
    /// `None` stands for an unknown element type and unifies with anything.
    pub fn merge(a: &Type, b: &Type) -> Option<Type> {
        match (a, b) {
            (Type::Mixed, _) | (_, Type::Mixed) => None,
            _ if a == b => Some(a.clone()),
            (Type::None, other) | (other, Type::None) => Some(other.clone()),
            (Type::Array(a), Type::Array(b)) => Type::merge(a, b).map(Type::array_of),
            _ => None,
        }
    }

    /// Returns `true` if a value of type `source` can be stored in a slot of type `self`.
    pub fn is_assignable_from(&self, source: &Type) -> bool {
        match (self, source) {
            (Type::Array(target), Type::List(element)) | (Type::Array(target), Type::Array(element)) => {
                target.fits_element(element)
            }
            _ => self.is_concrete() && self == source,
        }
    }

    fn fits_element(&self, element: &Type) -> bool {
        match element {
            Type::None => self.is_concrete(),
            Type::Mixed => false,
            element => self.is_assignable_from(element),
        }
    }

    /// The type of a variable declared without a type clause.
    /// Returns `None` if `initializer` does not determine a concrete type.
    pub fn concretize(initializer: &Type) -> Option<Type> {
        let ty = match initializer {
            Type::List(element) => Type::array_of(element.as_ref().clone()),
            other => other.clone(),
        };
        if ty.is_concrete() {
            Some(ty)
        } else {
            None
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::None => write!(f, "none"),
            Type::Boolean => write!(f, "boolean"),
            Type::Number => write!(f, "number"),
            Type::String => write!(f, "string"),
            Type::Mixed => write!(f, "mixed"),
            Type::Array(element) => write!(f, "array<{}>", element),
            Type::List(element) => write!(f, "list<{}>", element),
            Type::Object(template) => write!(f, "object<{}>", template),
        }
    }
}
