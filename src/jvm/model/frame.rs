use crate::jvm::class_file::{ConstantPool, StackMapFrame, VerificationType};
use crate::jvm::{Error, FieldType, MethodAccessFlags, MethodDescriptor, VerifierErrorKind};

/// Types of the local variables and operand stack at some offset in a method body
///
/// Every value takes exactly one slot: locals are contiguous from index 0, and the stack is
/// ordered bottom to top.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub code_offset: u16,
    pub locals: Vec<FieldType>,
    pub stack: Vec<FieldType>,
}

impl Frame {
    /// Frame at the very start of a method
    ///
    /// Non-static methods get the receiver in local 0, typed as the class declaring the method.
    /// The parameters follow in declaration order.
    pub fn entry(
        descriptor: &MethodDescriptor,
        access_flags: MethodAccessFlags,
        class_name: &str,
    ) -> Frame {
        let mut locals = vec![];
        if !access_flags.contains(MethodAccessFlags::STATIC) {
            locals.push(FieldType::object(class_name));
        }
        locals.extend(descriptor.parameters.iter().cloned());
        Frame {
            code_offset: 0,
            locals,
            stack: vec![],
        }
    }

    /// Copy of this frame, but at a different offset
    pub fn at(&self, code_offset: u16) -> Frame {
        Frame {
            code_offset,
            locals: self.locals.clone(),
            stack: self.stack.clone(),
        }
    }

    /// Type of a local variable
    pub fn local(&self, index: u16) -> Result<&FieldType, VerifierErrorKind> {
        self.locals
            .get(index as usize)
            .ok_or(VerifierErrorKind::InvalidIndex(index))
    }

    /// Set the type of a local variable
    ///
    /// Locals stay contiguous: the index must either already exist or be the next free one.
    pub fn set_local(&mut self, index: u16, field_type: FieldType) -> Result<(), VerifierErrorKind> {
        let index_usize = index as usize;
        if index_usize < self.locals.len() {
            self.locals[index_usize] = field_type;
            Ok(())
        } else if index_usize == self.locals.len() {
            self.locals.push(field_type);
            Ok(())
        } else {
            Err(VerifierErrorKind::InvalidIndex(index))
        }
    }

    pub fn push(&mut self, field_type: FieldType) {
        self.stack.push(field_type);
    }

    pub fn pop(&mut self) -> Result<FieldType, VerifierErrorKind> {
        self.stack.pop().ok_or(VerifierErrorKind::EmptyStack)
    }

    /// Pop a number of values off the stack, discarding them
    pub fn pop_n(&mut self, count: usize) -> Result<(), VerifierErrorKind> {
        let remaining = self
            .stack
            .len()
            .checked_sub(count)
            .ok_or(VerifierErrorKind::EmptyStack)?;
        self.stack.truncate(remaining);
        Ok(())
    }

    pub fn peek(&self) -> Result<&FieldType, VerifierErrorKind> {
        self.stack.last().ok_or(VerifierErrorKind::EmptyStack)
    }

    /// Encode the frame as a `full_frame`
    ///
    /// Reference types are registered in the constant pool as classes.
    pub fn full_frame(
        &self,
        offset_delta: u16,
        constants: &mut ConstantPool,
    ) -> Result<StackMapFrame, Error> {
        let locals = self
            .locals
            .iter()
            .map(|local| verification_type(local, constants))
            .collect::<Result<Vec<_>, Error>>()?;
        let stack = self
            .stack
            .iter()
            .map(|entry| verification_type(entry, constants))
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(StackMapFrame {
            offset_delta,
            locals,
            stack,
        })
    }
}

/// Verification type of a value
///
/// `int`-like types are all `int` to the verifier. Objects and arrays become class references,
/// while the remaining primitive types are not modeled.
pub fn verification_type(
    field_type: &FieldType,
    constants: &mut ConstantPool,
) -> Result<VerificationType, Error> {
    match field_type {
        FieldType::Base(base_type) if base_type.is_int_like() => Ok(VerificationType::Integer),
        FieldType::Base(_) => Err(Error::UnsupportedVerificationType(field_type.clone())),
        FieldType::Ref(ref_type) => {
            let class = constants.add_class(ref_type.class_name())?;
            log::trace!("verification type {:?} is class #{:?}", field_type, class);
            Ok(VerificationType::Object(class))
        }
    }
}
