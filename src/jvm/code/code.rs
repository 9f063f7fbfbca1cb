use crate::jvm::class_file;
use crate::jvm::class_file::{BytecodeArray, ConstantPool};
use crate::jvm::code::{Label, LabelGenerator};
use crate::jvm::model::{
    insert_attribute, serialize_attributes, Attribute, AttributeKind, AttributeParent, Attributes,
    Frame, ParentKind, StackMapTable,
};
use crate::jvm::{Error, MethodAccessFlags, MethodDescriptor};
use std::collections::HashMap;

/// Body of a method
///
/// Instructions are appended through [`crate::jvm::code::CodeBuilder`], which also keeps the
/// current frame and the frames at branch targets up to date. Jump offsets are only filled in
/// when the body is lowered.
#[derive(Debug)]
pub struct Code {
    pub(super) max_stack: u16,
    pub(super) max_locals: u16,

    /// Encoded instructions, with jump offsets left as 0
    pub(super) bytecode: Vec<u8>,

    /// Placed labels, along with the frame at the label (which knows its own offset)
    pub(super) labels: HashMap<Label, Frame>,

    /// Frames expected at labels that have been jumped to, but not placed yet
    pub(super) unplaced_labels: HashMap<Label, Frame>,

    /// Offsets of jump instructions, and the label each one jumps to
    pub(super) jumps: Vec<(usize, Label)>,

    pub(super) label_generator: LabelGenerator,
    pub(super) current_frame: Frame,

    /// Whether the last instruction can fall through to the next offset
    pub(super) reachable: bool,

    /// Frames at branch targets, in order of offset
    pub(super) frames: Vec<Frame>,

    pub(super) attributes: Attributes,
}

impl Code {
    /// Empty body for a method with the given signature
    pub fn new(
        descriptor: &MethodDescriptor,
        access_flags: MethodAccessFlags,
        class_name: &str,
    ) -> Result<Code, Error> {
        let entry = Frame::entry(descriptor, access_flags, class_name);
        let max_locals = u16::try_from(entry.locals.len()).map_err(|_| Error::ValueOverflow {
            what: "max_locals",
            value: entry.locals.len(),
        })?;
        Ok(Code {
            max_stack: 0,
            max_locals,
            bytecode: vec![],
            labels: HashMap::new(),
            unplaced_labels: HashMap::new(),
            jumps: vec![],
            label_generator: LabelGenerator::default(),
            frames: vec![entry.clone()],
            current_frame: entry,
            reachable: true,
            attributes: Attributes::new(),
        })
    }

    pub fn max_stack(&self) -> u16 {
        self.max_stack
    }

    pub fn max_locals(&self) -> u16 {
        self.max_locals
    }

    /// Instructions so far (jump offsets are not filled in yet)
    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    pub fn current_frame(&self) -> &Frame {
        &self.current_frame
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Offset of a label, if it has been placed
    pub fn label_offset(&self, label: Label) -> Option<u16> {
        self.labels.get(&label).map(|frame| frame.code_offset)
    }

    /// Attach a fresh attribute to the body, replacing any existing one of the same kind
    pub fn add_attribute(&mut self, kind: AttributeKind) -> Result<&mut Attribute, Error> {
        insert_attribute(&mut self.attributes, kind, AttributeParent::Code)
    }

    pub fn has_attribute(&self, kind: AttributeKind) -> bool {
        self.attributes.contains_key(&kind)
    }

    pub fn add_stack_map_table(&mut self) -> Result<&mut StackMapTable, Error> {
        self.add_attribute(AttributeKind::StackMapTable)?
            .as_stack_map_table_mut()
            .ok_or(Error::IllegalAttachment {
                attribute: AttributeKind::StackMapTable,
                parent: ParentKind::Code,
            })
    }

    pub fn stack_map_table(&self) -> Option<&StackMapTable> {
        self.attributes
            .get(&AttributeKind::StackMapTable)
            .and_then(Attribute::as_stack_map_table)
    }

    /// Lower the body, filling in jump offsets and handing the branch target frames to the stack
    /// map table (if there is one)
    pub fn serialize_code(&mut self, constants: &mut ConstantPool) -> Result<class_file::Code, Error> {
        let mut bytecode = self.bytecode.clone();
        for (jump_offset, label) in &self.jumps {
            let jump_offset = *jump_offset;
            let target = self
                .labels
                .get(label)
                .ok_or(Error::UnplacedLabel(*label))?
                .code_offset as usize;
            let relative = i16::try_from(target as isize - jump_offset as isize).map_err(|_| {
                Error::JumpOverflow {
                    from: jump_offset,
                    to: target,
                }
            })?;
            bytecode[jump_offset + 1..jump_offset + 3].copy_from_slice(&relative.to_be_bytes());
        }

        if let Some(table) = self
            .attributes
            .get_mut(&AttributeKind::StackMapTable)
            .and_then(Attribute::as_stack_map_table_mut)
        {
            table.set_frames(self.frames.clone());
        }
        let attributes = serialize_attributes(&mut self.attributes, constants)?;

        log::debug!(
            "lowered code ({} bytes, {} jumps, max_stack {}, max_locals {})",
            bytecode.len(),
            self.jumps.len(),
            self.max_stack,
            self.max_locals
        );
        Ok(class_file::Code {
            max_stack: self.max_stack,
            max_locals: self.max_locals,
            code_array: BytecodeArray(bytecode),
            attributes,
        })
    }
}
