use crate::jvm::Error;
use std::borrow::Cow;
use std::iter::Peekable;
use std::str::Chars;

/// Utility trait for converting descriptors to string representations
pub trait RenderDescriptor {
    /// Turn the descriptor into a string
    fn render(&self) -> String {
        let mut string = String::new();
        self.render_to(&mut string);
        string
    }

    /// Write the descriptor to a string
    fn render_to(&self, write_to: &mut String);
}

pub trait ParseDescriptor: Sized {
    /// Parse a descriptor from a string
    fn parse(source: &str) -> Result<Self, Error> {
        let mut chars = source.chars().peekable();
        let ret = Self::parse_from(&mut chars)?;
        match chars.next() {
            None => Ok(ret),
            Some(c) => Err(Error::BadDescriptor(format!(
                "Unexpected leftover input '{}' in '{}'",
                c, source
            ))),
        }
    }

    /// Read the descriptor from a character buffer
    fn parse_from(source: &mut Peekable<Chars<'_>>) -> Result<Self, Error>;
}

/// Primitive value types
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl BaseType {
    /// Does the verifier treat this type as `int`?
    ///
    /// `boolean`, `byte`, `char`, and `short` values all live in `int` slots at runtime.
    pub const fn is_int_like(&self) -> bool {
        matches!(
            self,
            BaseType::Int | BaseType::Boolean | BaseType::Byte | BaseType::Char | BaseType::Short
        )
    }

    /// Type code used by `newarray` to select the element type
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se14/html/jvms-6.html#jvms-6.5.newarray
    pub const fn array_type_code(&self) -> u8 {
        match self {
            BaseType::Boolean => 4,
            BaseType::Char => 5,
            BaseType::Float => 6,
            BaseType::Double => 7,
            BaseType::Byte => 8,
            BaseType::Short => 9,
            BaseType::Int => 10,
            BaseType::Long => 11,
        }
    }
}

impl RenderDescriptor for BaseType {
    fn render_to(&self, write_to: &mut String) {
        let c = match self {
            BaseType::Byte => 'B',
            BaseType::Char => 'C',
            BaseType::Double => 'D',
            BaseType::Float => 'F',
            BaseType::Int => 'I',
            BaseType::Long => 'J',
            BaseType::Short => 'S',
            BaseType::Boolean => 'Z',
        };
        write_to.push(c);
    }
}

impl ParseDescriptor for BaseType {
    fn parse_from(source: &mut Peekable<Chars<'_>>) -> Result<Self, Error> {
        let typ = match source.next() {
            Some('B') => BaseType::Byte,
            Some('C') => BaseType::Char,
            Some('D') => BaseType::Double,
            Some('F') => BaseType::Float,
            Some('I') => BaseType::Int,
            Some('J') => BaseType::Long,
            Some('S') => BaseType::Short,
            Some('Z') => BaseType::Boolean,
            Some(c) => {
                let msg = format!("Invalid base type character '{}'", c);
                return Err(Error::BadDescriptor(msg));
            }
            None => {
                let msg = String::from("Missing base type character");
                return Err(Error::BadDescriptor(msg));
            }
        };
        Ok(typ)
    }
}

/// Generic array type
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct ArrayType<T> {
    /// Additional dimensions (`A[]` has 0 additional dimensions, `A[][][][]` has 3)
    pub additional_dimensions: usize,

    /// Underlying element type (`A` is the underlying element type of `A[][]`)
    pub element_type: T,
}

impl<T> ArrayType<T> {
    /// Make an array type with the given (total) number of dimensions
    pub fn new(dimensions: usize, element_type: T) -> Result<ArrayType<T>, Error> {
        match dimensions.checked_sub(1) {
            Some(additional_dimensions) => Ok(ArrayType {
                additional_dimensions,
                element_type,
            }),
            None => Err(Error::ZeroDimensionArray),
        }
    }

    /// Total number of dimensions in the array type
    ///
    /// This is always just `additional_dimensions + 1`
    pub const fn dimensions(&self) -> usize {
        self.additional_dimensions + 1
    }
}

impl<T: RenderDescriptor> RenderDescriptor for ArrayType<T> {
    fn render_to(&self, write_to: &mut String) {
        for _ in 0..self.dimensions() {
            write_to.push('[');
        }
        self.element_type.render_to(write_to);
    }
}

/// Class names inside descriptors are wrapped as `L<internal/name>;`
impl RenderDescriptor for String {
    fn render_to(&self, write_to: &mut String) {
        write_to.push('L');
        write_to.push_str(self);
        write_to.push(';');
    }
}

impl ParseDescriptor for String {
    fn parse_from(source: &mut Peekable<Chars<'_>>) -> Result<Self, Error> {
        if source.next() != Some('L') {
            let msg = String::from("Expected object type to start with `L`");
            return Err(Error::BadDescriptor(msg));
        }
        let mut class_name = String::new();
        loop {
            match source.next() {
                Some(';') if class_name.is_empty() => {
                    let msg = String::from("Empty class name in object type");
                    return Err(Error::BadDescriptor(msg));
                }
                Some(';') => return Ok(class_name),
                Some(c @ ('.' | '[')) => {
                    let msg = format!("Illegal character '{}' in class name 'L{}'", c, class_name);
                    return Err(Error::BadDescriptor(msg));
                }
                Some(c) => class_name.push(c),
                None => {
                    let msg = format!("Missing terminator for 'L{}'", class_name);
                    return Err(Error::BadDescriptor(msg));
                }
            }
        }
    }
}

/// Reference type
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum RefType {
    /// Class or interface, by internal name (eg. `java/lang/String`)
    Object(String),
    ObjectArray(ArrayType<String>),
    PrimitiveArray(ArrayType<BaseType>),
}

impl RefType {
    /// Array whose elements are of the given type
    pub fn array(field_type: FieldType) -> RefType {
        match field_type {
            FieldType::Base(element_type) => RefType::PrimitiveArray(ArrayType {
                additional_dimensions: 0,
                element_type,
            }),
            FieldType::Ref(RefType::Object(element_type)) => RefType::ObjectArray(ArrayType {
                additional_dimensions: 0,
                element_type,
            }),
            FieldType::Ref(RefType::PrimitiveArray(arr)) => RefType::PrimitiveArray(ArrayType {
                additional_dimensions: arr.additional_dimensions + 1,
                element_type: arr.element_type,
            }),
            FieldType::Ref(RefType::ObjectArray(arr)) => RefType::ObjectArray(ArrayType {
                additional_dimensions: arr.additional_dimensions + 1,
                element_type: arr.element_type,
            }),
        }
    }

    /// Name under which this type is registered as a `CONSTANT_Class_info`
    ///
    /// Classes and interfaces use their bare internal name (`java/lang/String`, not
    /// `Ljava/lang/String;`), while array types use their full descriptor (`[I`).
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se14/html/jvms-4.html#jvms-4.4.1
    pub fn class_name(&self) -> Cow<'_, str> {
        match self {
            RefType::Object(name) => Cow::Borrowed(name.as_str()),
            other => Cow::Owned(other.render()),
        }
    }

    /// Type of the elements, if this is an array type
    pub fn component_type(&self) -> Option<FieldType> {
        match self {
            RefType::Object(_) => None,
            RefType::PrimitiveArray(arr) => Some(match arr.additional_dimensions {
                0 => FieldType::Base(arr.element_type),
                n => FieldType::Ref(RefType::PrimitiveArray(ArrayType {
                    additional_dimensions: n - 1,
                    element_type: arr.element_type,
                })),
            }),
            RefType::ObjectArray(arr) => Some(match arr.additional_dimensions {
                0 => FieldType::object(arr.element_type.clone()),
                n => FieldType::Ref(RefType::ObjectArray(ArrayType {
                    additional_dimensions: n - 1,
                    element_type: arr.element_type.clone(),
                })),
            }),
        }
    }
}

impl RenderDescriptor for RefType {
    fn render_to(&self, write_to: &mut String) {
        match self {
            RefType::Object(cls) => cls.render_to(write_to),
            RefType::PrimitiveArray(arr) => arr.render_to(write_to),
            RefType::ObjectArray(arr) => arr.render_to(write_to),
        }
    }
}

impl ParseDescriptor for RefType {
    fn parse_from(source: &mut Peekable<Chars<'_>>) -> Result<Self, Error> {
        Ok(match source.peek().copied() {
            Some('L') => RefType::Object(String::parse_from(source)?),
            Some('[') => {
                let mut dimensions = 0;
                while source.next_if_eq(&'[').is_some() {
                    dimensions += 1;
                }
                if let Some('L') = source.peek().copied() {
                    RefType::ObjectArray(ArrayType::new(dimensions, String::parse_from(source)?)?)
                } else {
                    let element_type = BaseType::parse_from(source)?;
                    RefType::PrimitiveArray(ArrayType::new(dimensions, element_type)?)
                }
            }
            Some(c) => {
                let msg = format!("Invalid reference type character '{}'", c);
                return Err(Error::BadDescriptor(msg));
            }
            None => return Err(Error::BadDescriptor(String::from("Missing field type"))),
        })
    }
}

/// Type of a class, instance, or local variable
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum FieldType {
    Base(BaseType),
    Ref(RefType),
}

impl FieldType {
    pub fn array(field_type: FieldType) -> FieldType {
        FieldType::Ref(RefType::array(field_type))
    }

    pub fn object(class_name: impl Into<String>) -> FieldType {
        FieldType::Ref(RefType::Object(class_name.into()))
    }

    pub const fn int() -> FieldType {
        FieldType::Base(BaseType::Int)
    }

    pub const fn long() -> FieldType {
        FieldType::Base(BaseType::Long)
    }

    pub const fn float() -> FieldType {
        FieldType::Base(BaseType::Float)
    }

    pub const fn double() -> FieldType {
        FieldType::Base(BaseType::Double)
    }

    pub const fn char() -> FieldType {
        FieldType::Base(BaseType::Char)
    }

    pub const fn short() -> FieldType {
        FieldType::Base(BaseType::Short)
    }

    pub const fn byte() -> FieldType {
        FieldType::Base(BaseType::Byte)
    }

    pub const fn boolean() -> FieldType {
        FieldType::Base(BaseType::Boolean)
    }

    /// `java.lang.String`, which shows up often enough to deserve a shortcut
    pub fn string() -> FieldType {
        FieldType::object("java/lang/String")
    }
}

impl RenderDescriptor for FieldType {
    fn render_to(&self, write_to: &mut String) {
        match self {
            FieldType::Base(base_type) => base_type.render_to(write_to),
            FieldType::Ref(reference_type) => reference_type.render_to(write_to),
        }
    }
}

impl ParseDescriptor for FieldType {
    fn parse_from(source: &mut Peekable<Chars<'_>>) -> Result<Self, Error> {
        match source.peek().copied() {
            None => Err(Error::BadDescriptor(String::from("Missing field type"))),
            Some('B' | 'C' | 'D' | 'F' | 'I' | 'J' | 'S' | 'Z') => {
                BaseType::parse_from(source).map(FieldType::Base)
            }
            Some('L' | '[') => RefType::parse_from(source).map(FieldType::Ref),
            Some(c) => {
                let msg = format!("Invalid field type character '{}'", c);
                Err(Error::BadDescriptor(msg))
            }
        }
    }
}

/// Signature of a method
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub struct MethodDescriptor {
    pub parameters: Vec<FieldType>,
    pub return_type: Option<FieldType>, // `None` is for `void` (ie. no return)
}

impl RenderDescriptor for MethodDescriptor {
    fn render_to(&self, write_to: &mut String) {
        write_to.push('(');
        for parameter in &self.parameters {
            parameter.render_to(write_to);
        }
        write_to.push(')');
        match &self.return_type {
            None => write_to.push('V'),
            Some(typ) => typ.render_to(write_to),
        };
    }
}

impl ParseDescriptor for MethodDescriptor {
    fn parse_from(source: &mut Peekable<Chars<'_>>) -> Result<Self, Error> {
        if source.next() != Some('(') {
            let msg = String::from("Expected '(' for method");
            return Err(Error::BadDescriptor(msg));
        }

        let mut parameters = vec![];
        while source.next_if_eq(&')').is_none() {
            if source.peek().is_none() {
                let msg = String::from("Expected ')' for method");
                return Err(Error::BadDescriptor(msg));
            }
            parameters.push(FieldType::parse_from(source)?);
        }

        let return_type = if source.next_if_eq(&'V').is_some() {
            None
        } else {
            Some(FieldType::parse_from(source)?)
        };

        Ok(MethodDescriptor {
            parameters,
            return_type,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fmt::Debug;

    fn round_trip<T: RenderDescriptor + ParseDescriptor + Debug + Eq>(rendered: &str, parsed: T) {
        assert_eq!(rendered, parsed.render());
        assert_eq!(T::parse(rendered).unwrap(), parsed);
    }

    #[test]
    fn field_types() {
        round_trip("I", FieldType::int());
        round_trip("Z", FieldType::boolean());
        round_trip("Ljava/lang/Object;", FieldType::object("java/lang/Object"));
        round_trip(
            "[[[D",
            FieldType::array(FieldType::array(FieldType::array(FieldType::double()))),
        );
        round_trip("[Ljava/lang/String;", FieldType::array(FieldType::string()));
    }

    #[test]
    fn method_descriptors() {
        round_trip(
            "(I[Ljava/lang/String;)Ljava/lang/Object;",
            MethodDescriptor {
                parameters: vec![FieldType::int(), FieldType::array(FieldType::string())],
                return_type: Some(FieldType::object("java/lang/Object")),
            },
        );
        round_trip(
            "()V",
            MethodDescriptor {
                parameters: vec![],
                return_type: None,
            },
        );
    }

    #[test]
    fn malformed_descriptors() {
        assert!(matches!(FieldType::parse("V"), Err(Error::BadDescriptor(_))));
        assert!(matches!(FieldType::parse("Ljava/lang/Object"), Err(Error::BadDescriptor(_))));
        assert!(matches!(FieldType::parse("L;"), Err(Error::BadDescriptor(_))));
        assert!(matches!(FieldType::parse("II"), Err(Error::BadDescriptor(_))));
        assert!(matches!(MethodDescriptor::parse("(I"), Err(Error::BadDescriptor(_))));
        assert!(matches!(MethodDescriptor::parse("I)V"), Err(Error::BadDescriptor(_))));
    }

    #[test]
    fn zero_dimension_array() {
        assert!(matches!(ArrayType::new(0, BaseType::Int), Err(Error::ZeroDimensionArray)));
        let arr = ArrayType::new(2, BaseType::Int).unwrap();
        assert_eq!(arr.additional_dimensions, 1);
        assert_eq!(RefType::PrimitiveArray(arr).render(), "[[I");
    }

    #[test]
    fn class_names() {
        assert_eq!(RefType::Object(String::from("java/lang/String")).class_name(), "java/lang/String");
        assert_eq!(RefType::array(FieldType::int()).class_name(), "[I");
        assert_eq!(
            RefType::array(FieldType::string()).class_name(),
            "[Ljava/lang/String;"
        );
    }

    #[test]
    fn component_types() {
        let matrix = RefType::array(FieldType::array(FieldType::int()));
        assert_eq!(matrix.component_type(), Some(FieldType::array(FieldType::int())));
        let strings = RefType::array(FieldType::string());
        assert_eq!(strings.component_type(), Some(FieldType::string()));
        assert_eq!(RefType::Object(String::from("A")).component_type(), None);
    }
}
