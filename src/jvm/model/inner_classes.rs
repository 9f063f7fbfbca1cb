use crate::jvm::class_file;
use crate::jvm::class_file::{ConstantPool, InnerClass};
use crate::jvm::model::Class;
use crate::jvm::{Error, InnerClassAccessFlags};

/// Nested classes declared by a class
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se14/html/jvms-4.html#jvms-4.7.6
#[derive(Debug, Clone)]
pub struct InnerClasses {
    /// Internal name of the class carrying the attribute
    outer_class: String,
    entries: Vec<InnerClassEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClassEntry {
    /// Name of the inner class' own class file (eg. `Outer$Inner`)
    pub source_file_name: String,

    /// Simple name of the inner class, as written in the source
    pub inner_name: String,

    pub access_flags: InnerClassAccessFlags,
}

impl InnerClasses {
    pub fn new(outer_class: impl Into<String>) -> InnerClasses {
        InnerClasses {
            outer_class: outer_class.into(),
            entries: vec![],
        }
    }

    pub fn outer_class(&self) -> &str {
        &self.outer_class
    }

    pub fn entries(&self) -> &[InnerClassEntry] {
        &self.entries
    }

    /// Record a nested class, using the name and access flags it was declared with
    pub fn add(&mut self, inner: &Class, source_file_name: impl Into<String>) {
        self.add_entry(inner.name(), inner.access_flags().into(), source_file_name);
    }

    /// Record a nested class
    pub fn add_entry(
        &mut self,
        inner_name: impl Into<String>,
        access_flags: InnerClassAccessFlags,
        source_file_name: impl Into<String>,
    ) {
        self.entries.push(InnerClassEntry {
            source_file_name: source_file_name.into(),
            inner_name: inner_name.into(),
            access_flags,
        });
    }

    pub fn serialize_inner_classes(
        &self,
        constants: &mut ConstantPool,
    ) -> Result<class_file::InnerClasses, Error> {
        let entries = self
            .entries
            .iter()
            .map(|entry| -> Result<InnerClass, Error> {
                Ok(InnerClass {
                    inner_class: constants.add_class(entry.source_file_name.as_str())?,
                    outer_class: constants.add_class(self.outer_class.as_str())?,
                    inner_name: constants.add_utf8(entry.inner_name.as_str())?,
                    access_flags: entry.access_flags,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(class_file::InnerClasses(entries))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_file::{AttributeLike, Serialize};
    use crate::jvm::ClassAccessFlags;

    #[test]
    fn entries_point_at_outer_class() {
        let inner = Class::new(
            "Inner",
            "java/lang/Object",
            ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
        );
        let mut inner_classes = InnerClasses::new("Outer");
        inner_classes.add(&inner, "Outer$Inner");

        let mut pool = ConstantPool::new();
        let lowered = inner_classes.serialize_inner_classes(&mut pool).unwrap();
        let attribute = pool.get_attribute(&lowered).unwrap();
        assert_eq!(pool.utf8(attribute.name_index), Some(class_file::InnerClasses::NAME));

        // #1 "Outer$Inner", #2 class, #3 "Outer", #4 class, #5 "Inner". The flags keep `SUPER`
        assert_eq!(
            lowered.to_bytes().unwrap(),
            vec![0, 1, 0, 2, 0, 4, 0, 5, 0x00, 0x21]
        );
        assert_eq!(attribute.info.len(), 2 + 8);
    }

    #[test]
    fn empty_attribute() {
        let mut pool = ConstantPool::new();
        let lowered = InnerClasses::new("Outer")
            .serialize_inner_classes(&mut pool)
            .unwrap();
        assert_eq!(lowered.to_bytes().unwrap(), vec![0, 0]);
        assert_eq!(pool.size(), 0);
    }
}
