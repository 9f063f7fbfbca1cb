use crate::jvm::class_file::{ClassFile, ConstantPool, Serialize, Version};
use crate::jvm::code::CodeBuilder;
use crate::jvm::model::attribute::{insert_attribute, serialize_attributes};
use crate::jvm::model::{
    Attribute, AttributeKind, AttributeParent, Attributes, Field, InnerClasses, Method,
};
use crate::jvm::{
    ClassAccessFlags, Error, FieldAccessFlags, FieldType, MethodAccessFlags, MethodDescriptor,
    RenderDescriptor,
};
use indexmap::map::Entry;
use indexmap::{IndexMap, IndexSet};

/// Fields and methods are identified by name and rendered descriptor
type MemberKey = (String, String);

/// Class being generated
///
/// The class owns the constant pool that all of its members intern into. Building happens through
/// `&mut` methods, and [`Class::generate`] then interns whatever is left and produces the bytes
/// of the class file.
#[derive(Debug)]
pub struct Class {
    name: String,
    super_name: String,
    access_flags: ClassAccessFlags,
    version: Version,
    interfaces: IndexSet<String>,
    fields: IndexMap<MemberKey, Field>,
    methods: IndexMap<MemberKey, Method>,
    attributes: Attributes,
    constants: ConstantPool,
}

impl Class {
    /// Start a new class, given its internal name and the internal name of its superclass
    pub fn new(
        name: impl Into<String>,
        super_name: impl Into<String>,
        access_flags: ClassAccessFlags,
    ) -> Class {
        Class {
            name: name.into(),
            super_name: super_name.into(),
            access_flags,
            version: Version::JAVA14,
            interfaces: IndexSet::new(),
            fields: IndexMap::new(),
            methods: IndexMap::new(),
            attributes: Attributes::new(),
            constants: ConstantPool::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn super_name(&self) -> &str {
        &self.super_name
    }

    pub fn access_flags(&self) -> ClassAccessFlags {
        self.access_flags
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Declare that the class implements an interface (repeats are ignored)
    pub fn add_interface(&mut self, interface: impl Into<String>) {
        self.interfaces.insert(interface.into());
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &str> + '_ {
        self.interfaces.iter().map(String::as_str)
    }

    /// Add a new field
    ///
    /// Fails if there is already a field with the same name and descriptor.
    pub fn add_field(
        &mut self,
        name: impl Into<String>,
        descriptor: FieldType,
        access_flags: FieldAccessFlags,
    ) -> Result<&mut Field, Error> {
        let name = name.into();
        match self.fields.entry((name.clone(), descriptor.render())) {
            Entry::Occupied(occupied) => Err(duplicate_member(occupied.key())),
            Entry::Vacant(vacant) => {
                log::debug!("adding field {}.{}:{}", self.name, name, vacant.key().1);
                Ok(vacant.insert(Field::new(name, descriptor, access_flags)))
            }
        }
    }

    /// Add a new method
    ///
    /// Fails if there is already a method with the same name and descriptor.
    pub fn add_method(
        &mut self,
        name: impl Into<String>,
        descriptor: MethodDescriptor,
        access_flags: MethodAccessFlags,
    ) -> Result<&mut Method, Error> {
        let name = name.into();
        match self.methods.entry((name.clone(), descriptor.render())) {
            Entry::Occupied(occupied) => Err(duplicate_member(occupied.key())),
            Entry::Vacant(vacant) => {
                log::debug!("adding method {}.{}{}", self.name, name, vacant.key().1);
                let method = Method::new(name, descriptor, access_flags, self.name.as_str());
                Ok(vacant.insert(method))
            }
        }
    }

    pub fn has_field(&self, name: &str, descriptor: &FieldType) -> bool {
        self.fields.contains_key(&member_key(name, descriptor))
    }

    pub fn get_field(&self, name: &str, descriptor: &FieldType) -> Option<&Field> {
        self.fields.get(&member_key(name, descriptor))
    }

    pub fn get_field_mut(&mut self, name: &str, descriptor: &FieldType) -> Option<&mut Field> {
        self.fields.get_mut(&member_key(name, descriptor))
    }

    pub fn has_method(&self, name: &str, descriptor: &MethodDescriptor) -> bool {
        self.methods.contains_key(&member_key(name, descriptor))
    }

    pub fn get_method(&self, name: &str, descriptor: &MethodDescriptor) -> Option<&Method> {
        self.methods.get(&member_key(name, descriptor))
    }

    pub fn get_method_mut(
        &mut self,
        name: &str,
        descriptor: &MethodDescriptor,
    ) -> Option<&mut Method> {
        self.methods.get_mut(&member_key(name, descriptor))
    }

    /// Attach a fresh attribute to the class, replacing any existing one of the same kind
    pub fn add_attribute(&mut self, kind: AttributeKind) -> Result<&mut Attribute, Error> {
        let parent = AttributeParent::Class { name: &self.name };
        insert_attribute(&mut self.attributes, kind, parent)
    }

    pub fn has_attribute(&self, kind: AttributeKind) -> bool {
        self.attributes.contains_key(&kind)
    }

    pub fn get_attribute(&self, kind: AttributeKind) -> Option<&Attribute> {
        self.attributes.get(&kind)
    }

    pub fn get_attribute_mut(&mut self, kind: AttributeKind) -> Option<&mut Attribute> {
        self.attributes.get_mut(&kind)
    }

    pub fn inner_classes_mut(&mut self) -> Option<&mut InnerClasses> {
        self.get_attribute_mut(AttributeKind::InnerClasses)
            .and_then(Attribute::as_inner_classes_mut)
    }

    pub fn constants(&self) -> &ConstantPool {
        &self.constants
    }

    pub fn constants_mut(&mut self) -> &mut ConstantPool {
        &mut self.constants
    }

    /// Emit code into the body of a method, creating the body if it doesn't exist yet
    pub fn code_builder(
        &mut self,
        name: &str,
        descriptor: &MethodDescriptor,
    ) -> Result<CodeBuilder<'_>, Error> {
        let key = member_key(name, descriptor);
        let method = match self.methods.get_mut(&key) {
            Some(method) => method,
            None => {
                let (name, descriptor) = key;
                return Err(Error::MissingMember { name, descriptor });
            }
        };
        let code = method.code_or_insert()?;
        Ok(CodeBuilder::new(code, &mut self.constants))
    }

    /// Lower the class into its class file representation
    ///
    /// Everything the class refers to gets interned before the constant pool is copied out, so
    /// the pool in the class file is complete.
    pub fn class_file(&mut self) -> Result<ClassFile, Error> {
        let constants = &mut self.constants;

        let this_class = constants.add_class(self.name.as_str())?;
        let super_class = constants.add_class(self.super_name.as_str())?;
        let interfaces = self
            .interfaces
            .iter()
            .map(|interface| constants.add_class(interface.as_str()))
            .collect::<Result<Vec<_>, Error>>()?;
        let fields = self
            .fields
            .values_mut()
            .map(|field| field.serialize_field(constants))
            .collect::<Result<Vec<_>, Error>>()?;
        let methods = self
            .methods
            .values_mut()
            .map(|method| method.serialize_method(constants))
            .collect::<Result<Vec<_>, Error>>()?;
        let attributes = serialize_attributes(&mut self.attributes, constants)?;

        Ok(ClassFile {
            version: self.version,
            constants: constants.clone(),
            access_flags: self.access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    /// Produce the bytes of the class file
    ///
    /// This can be called repeatedly, and gives the same bytes as long as the class hasn't been
    /// changed in between.
    pub fn generate(&mut self) -> Result<Vec<u8>, Error> {
        let class_file = self.class_file()?;
        let bytes = class_file.to_bytes()?;
        log::debug!(
            "generated class {} ({} constants, {} fields, {} methods, {} bytes)",
            self.name,
            self.constants.size(),
            class_file.fields.len(),
            class_file.methods.len(),
            bytes.len()
        );
        Ok(bytes)
    }
}

fn member_key(name: &str, descriptor: &impl RenderDescriptor) -> MemberKey {
    (name.to_owned(), descriptor.render())
}

fn duplicate_member((name, descriptor): &MemberKey) -> Error {
    Error::DuplicateMember {
        name: name.clone(),
        descriptor: descriptor.clone(),
    }
}
