use crate::jvm::class_file::{Constant, ConstantIndex, ConstantPool, Serialize};
use crate::jvm::code::{BranchInstruction, Code, Instruction, Label};
use crate::jvm::model::Frame;
use crate::jvm::{Error, FieldType, MethodDescriptor, ParseDescriptor, VerifierErrorKind};

/// Fluent interface for appending to the body of a method
///
/// Every instruction is interpreted against the current frame as it is pushed, which keeps
/// `max_stack` and `max_locals` up to date and makes it possible to snapshot the frame at every
/// branch target. The types are only tracked, never checked: an instruction only fails if the
/// frame can't describe its effect at all (eg. popping an empty stack).
///
/// ### Frames at labels
///
/// Every jump records the frame it expects at its target, and placing a label records the frame
/// at the label's offset. Falling through and jumping into a label must agree on that frame. Code
/// after an unconditional jump is not reachable by falling through, so a label placed there takes
/// the frame the jumps to it expect. For a label only jumped to from later on, start from the
/// frame of some other label instead (see [`CodeBuilder::place_label_from`]).
pub struct CodeBuilder<'a> {
    code: &'a mut Code,
    constants: &'a mut ConstantPool,
}

impl<'a> CodeBuilder<'a> {
    pub fn new(code: &'a mut Code, constants: &'a mut ConstantPool) -> CodeBuilder<'a> {
        CodeBuilder { code, constants }
    }

    /// Constant pool of the class, for interning the operands of instructions
    pub fn constants(&mut self) -> &mut ConstantPool {
        &mut *self.constants
    }

    pub fn code(&self) -> &Code {
        &*self.code
    }

    pub fn current_frame(&self) -> &Frame {
        &self.code.current_frame
    }

    /// Generate a fresh label
    pub fn fresh_label(&mut self) -> Label {
        self.code.label_generator.fresh_label()
    }

    /// Offset at which the next instruction will go
    fn current_offset(&self) -> Result<u16, Error> {
        let offset = self.code.bytecode.len();
        u16::try_from(offset).map_err(|_| Error::ValueOverflow {
            what: "code offset",
            value: offset,
        })
    }

    /// Place a label at the current offset
    ///
    /// The frame at the label is the frame falling through into it. After an unconditional jump,
    /// it is instead the frame of the jumps to the label (or the current frame, if there are none
    /// yet). Fails if the label was jumped to with a different frame than the one falling through.
    pub fn place_label(&mut self, label: Label) -> Result<&mut Self, Error> {
        let frame = match self.code.unplaced_labels.get(&label) {
            Some(expected) if !self.code.reachable => expected.clone(),
            _ => self.code.current_frame.clone(),
        };
        self.place_label_with_frame(label, frame)
    }

    /// Place a label at the current offset, starting over from the frame of an earlier label
    pub fn place_label_from(&mut self, label: Label, parent: Label) -> Result<&mut Self, Error> {
        let frame = self
            .code
            .labels
            .get(&parent)
            .ok_or(Error::UnplacedLabel(parent))?
            .clone();
        self.place_label_with_frame(label, frame)
    }

    fn place_label_with_frame(&mut self, label: Label, frame: Frame) -> Result<&mut Self, Error> {
        if self.code.labels.contains_key(&label) {
            return Err(Error::DuplicateLabel(label));
        }
        if self.code.reachable {
            check_frames(label, &self.code.current_frame, &frame)?;
        }
        if let Some(expected) = self.code.unplaced_labels.get(&label) {
            check_frames(label, &frame, expected)?;
        }

        let frame = frame.at(self.current_offset()?);
        log::trace!("{:?} at offset {}", label, frame.code_offset);
        self.code.unplaced_labels.remove(&label);
        self.code.current_frame = frame.clone();
        self.code.reachable = true;
        self.code.frames.push(frame.clone());
        self.code.labels.insert(label, frame);
        Ok(self)
    }

    /// Push a non-branching instruction
    pub fn push_instruction(&mut self, insn: Instruction) -> Result<&mut Self, Error> {
        let offset = self.code.bytecode.len();
        let mut frame = self.code.current_frame.clone();
        interpret_instruction(&mut frame, &*self.constants, &insn).map_err(|kind| {
            Error::VerifierError {
                instruction: format!("{:?}", insn),
                kind,
            }
        })?;
        self.enter_instruction()?;
        insn.serialize(&mut self.code.bytecode)?;
        self.code.current_frame = frame;
        self.update_maximums()?;
        log::trace!("{:>5}: {:?}", offset, insn);
        Ok(self)
    }

    /// Push a branching instruction
    ///
    /// The jump offset is filled in once the body is lowered, since the target label may not be
    /// placed yet. The frame after the jump is what the target label will expect. After a `goto`
    /// or a return, whatever comes next gets a frame of its own.
    pub fn push_branch_instruction(&mut self, insn: BranchInstruction) -> Result<&mut Self, Error> {
        let offset = self.code.bytecode.len();
        let mut frame = self.code.current_frame.clone();
        interpret_branch_instruction(&mut frame, &insn).map_err(|kind| Error::VerifierError {
            instruction: format!("{:?}", insn),
            kind,
        })?;
        if let Some(target) = insn.jump_target() {
            self.expect_frame(target, &frame)?;
        }

        self.enter_instruction()?;
        insn.opcode().serialize(&mut self.code.bytecode)?;
        if let Some(target) = insn.jump_target() {
            self.code.jumps.push((offset, target));
            0i16.serialize(&mut self.code.bytecode)?;
        }
        self.code.current_frame = frame;
        self.update_maximums()?;
        log::trace!("{:>5}: {:?}", offset, insn);

        if insn.is_unconditional() {
            self.code.reachable = false;
        }
        Ok(self)
    }

    /// Record the frame a jump expects at its target
    fn expect_frame(&mut self, target: Label, frame: &Frame) -> Result<(), Error> {
        if let Some(placed) = self.code.labels.get(&target) {
            check_frames(target, frame, placed)
        } else if let Some(expected) = self.code.unplaced_labels.get(&target) {
            check_frames(target, frame, expected)
        } else {
            self.code.unplaced_labels.insert(target, frame.clone());
            Ok(())
        }
    }

    /// Code that can't be reached by falling through still needs a frame
    fn enter_instruction(&mut self) -> Result<(), Error> {
        if !self.code.reachable {
            let frame = self.code.current_frame.at(self.current_offset()?);
            self.code.frames.push(frame);
            self.code.reachable = true;
        }
        Ok(())
    }

    /// Add a new local variable, returning its index
    pub fn alloc_local(&mut self, field_type: FieldType) -> Result<u16, Error> {
        let index = self.code.current_frame.locals.len();
        let index = u16::try_from(index).map_err(|_| Error::ValueOverflow {
            what: "local variable index",
            value: index,
        })?;
        self.code.current_frame.locals.push(field_type);
        self.update_maximums()?;
        Ok(index)
    }

    /// Have the branch target frames written out as a `StackMapTable` on the body
    pub fn add_stack_map_table(&mut self) -> Result<&mut Self, Error> {
        self.code.add_stack_map_table()?;
        Ok(self)
    }

    fn update_maximums(&mut self) -> Result<(), Error> {
        let frame = &self.code.current_frame;
        let stack = u16::try_from(frame.stack.len()).map_err(|_| Error::ValueOverflow {
            what: "max_stack",
            value: frame.stack.len(),
        })?;
        let locals = u16::try_from(frame.locals.len()).map_err(|_| Error::ValueOverflow {
            what: "max_locals",
            value: frame.locals.len(),
        })?;
        self.code.max_stack = self.code.max_stack.max(stack);
        self.code.max_locals = self.code.max_locals.max(locals);
        Ok(())
    }
}

/// Update the frame to reflect the effects of the given instruction
fn interpret_instruction(
    frame: &mut Frame,
    constants: &ConstantPool,
    insn: &Instruction,
) -> Result<(), VerifierErrorKind> {
    use Instruction::*;

    match insn {
        IConstM1 | IConst0 | IConst1 | IConst2 | IConst3 | IConst4 | IConst5 => {
            frame.push(FieldType::int());
        }
        BiPush(_) | SiPush(_) => {
            frame.push(FieldType::int());
        }
        Ldc(index) => {
            let loaded = match constants.get(*index) {
                Some(Constant::Integer(_)) => FieldType::int(),
                Some(Constant::String(_)) => FieldType::string(),
                Some(Constant::Class(_)) => FieldType::object("java/lang/Class"),
                Some(_) => return Err(VerifierErrorKind::NotLoadableConstant(*index)),
                None => return Err(VerifierErrorKind::MissingConstant(*index)),
            };
            frame.push(loaded);
        }

        ILoad(index) => {
            frame.local(*index)?;
            frame.push(FieldType::int());
        }
        ALoad(index) => {
            let loaded = frame.local(*index)?.clone();
            frame.push(loaded);
        }
        IALoad | BALoad => {
            frame.pop()?;
            component_type(&frame.pop()?)?;
            frame.push(FieldType::int());
        }
        AALoad => {
            frame.pop()?;
            let component = component_type(&frame.pop()?)?;
            frame.push(component);
        }

        IStore(index) | AStore(index) => {
            let stored = frame.pop()?;
            frame.set_local(*index, stored)?;
        }
        IAStore | AAStore | BAStore => {
            frame.pop_n(3)?;
        }

        Pop => {
            frame.pop()?;
        }
        Dup => {
            let top = frame.peek()?.clone();
            frame.push(top);
        }
        Swap => {
            let arg1 = frame.pop()?;
            let arg2 = frame.pop()?;
            frame.push(arg1);
            frame.push(arg2);
        }

        IAdd | ISub | IMul | IDiv | IRem | IShl | IShr => {
            frame.pop_n(2)?;
            frame.push(FieldType::int());
        }
        INeg => {
            frame.pop()?;
            frame.push(FieldType::int());
        }
        IInc(index, _) => {
            frame.local(*index)?;
        }

        GetStatic(field) => {
            let field_type: FieldType = constant_descriptor(constants, *field)?;
            frame.push(field_type);
        }
        PutStatic(_) => {
            frame.pop()?;
        }
        GetField(field) => {
            let field_type: FieldType = constant_descriptor(constants, *field)?;
            frame.pop()?;
            frame.push(field_type);
        }
        PutField(_) => {
            frame.pop_n(2)?;
        }

        InvokeVirtual(method) | InvokeSpecial(method) => {
            let descriptor: MethodDescriptor = constant_descriptor(constants, *method)?;
            frame.pop_n(descriptor.parameters.len() + 1)?;
            frame.stack.extend(descriptor.return_type);
        }
        InvokeStatic(method) => {
            let descriptor: MethodDescriptor = constant_descriptor(constants, *method)?;
            frame.pop_n(descriptor.parameters.len())?;
            frame.stack.extend(descriptor.return_type);
        }

        New(class) => {
            let class_type: FieldType = constant_descriptor(constants, *class)?;
            frame.push(class_type);
        }
        NewArray(base_type) => {
            frame.pop()?;
            frame.push(FieldType::array(FieldType::Base(*base_type)));
        }
        ANewArray(class) => {
            let class_type: FieldType = constant_descriptor(constants, *class)?;
            frame.pop()?;
            frame.push(FieldType::array(class_type));
        }
        ArrayLength => {
            component_type(&frame.pop()?)?;
            frame.push(FieldType::int());
        }
    }

    Ok(())
}

/// Update the frame to reflect the effects of the given branching instruction
fn interpret_branch_instruction(
    frame: &mut Frame,
    insn: &BranchInstruction,
) -> Result<(), VerifierErrorKind> {
    use BranchInstruction::*;

    match insn {
        If(_, _) => {
            frame.pop()?;
        }
        IfICmp(_, _) | IfACmp(_, _) => {
            frame.pop_n(2)?;
        }
        Goto(_) => (),
        IReturn | AReturn => {
            frame.pop()?;
            frame.stack.clear();
        }
        Return => frame.stack.clear(),
    }

    Ok(())
}

/// Check that a label is reached with the frame it expects
fn check_frames(label: Label, found: &Frame, expected: &Frame) -> Result<(), Error> {
    if found.locals == expected.locals && found.stack == expected.stack {
        Ok(())
    } else {
        Err(Error::IncompatibleFrames {
            label,
            found: found.clone(),
            expected: expected.clone(),
        })
    }
}

/// Type of the elements of an array
fn component_type(array_type: &FieldType) -> Result<FieldType, VerifierErrorKind> {
    match array_type {
        FieldType::Ref(ref_type) => ref_type.component_type().ok_or(VerifierErrorKind::NotArrayType),
        FieldType::Base(_) => Err(VerifierErrorKind::NotArrayType),
    }
}

/// Parse the descriptor of a constant pool entry
fn constant_descriptor<D: ParseDescriptor>(
    constants: &ConstantPool,
    index: impl Into<ConstantIndex>,
) -> Result<D, VerifierErrorKind> {
    let index = index.into();
    let descriptor = constants
        .find_descriptor_by_index(index)
        .ok_or(VerifierErrorKind::MissingConstant(index))?;
    D::parse(&descriptor).map_err(|_| VerifierErrorKind::InvalidDescriptor(index))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::OrdComparison;
    use crate::jvm::model::AttributeKind;
    use crate::jvm::{BaseType, MethodAccessFlags};

    fn static_body(parameters: Vec<FieldType>) -> Code {
        let descriptor = MethodDescriptor {
            parameters,
            return_type: None,
        };
        Code::new(&descriptor, MethodAccessFlags::STATIC, "Hi").unwrap()
    }

    #[test]
    fn forward_jump_is_backpatched() {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut code = static_body(vec![]);
        let mut pool = ConstantPool::new();
        let mut builder = CodeBuilder::new(&mut code, &mut pool);
        let end = builder.fresh_label();
        builder
            .push_instruction(Instruction::IConst0)
            .unwrap()
            .push_branch_instruction(BranchInstruction::If(OrdComparison::EQ, end))
            .unwrap()
            .push_instruction(Instruction::IConst1)
            .unwrap()
            .push_instruction(Instruction::Pop)
            .unwrap()
            .place_label(end)
            .unwrap()
            .push_branch_instruction(BranchInstruction::Return)
            .unwrap();

        // Offsets stay unresolved until lowering
        assert_eq!(code.bytecode(), &[0x03, 0x99, 0, 0, 0x04, 0x57, 0xb1]);
        assert_eq!(code.label_offset(end), Some(6));

        let lowered = code.serialize_code(&mut pool).unwrap();
        assert_eq!(lowered.code_array.0, vec![0x03, 0x99, 0, 5, 0x04, 0x57, 0xb1]);
        assert_eq!(lowered.max_stack, 1);
        assert_eq!(lowered.max_locals, 0);
    }

    #[test]
    fn backward_jump_is_negative() {
        let mut code = static_body(vec![]);
        let mut pool = ConstantPool::new();
        let mut builder = CodeBuilder::new(&mut code, &mut pool);
        let top = builder.fresh_label();
        builder
            .place_label(top)
            .unwrap()
            .push_instruction(Instruction::IConst0)
            .unwrap()
            .push_instruction(Instruction::Pop)
            .unwrap()
            .push_branch_instruction(BranchInstruction::Goto(top))
            .unwrap();

        let lowered = code.serialize_code(&mut pool).unwrap();
        assert_eq!(lowered.code_array.0, vec![0x03, 0x57, 0xa7, 0xff, 0xfe]);

        // Entry frame and frame at `top`. Nothing follows the `goto`, so it gets no frame
        let offsets: Vec<u16> = code.frames().iter().map(|frame| frame.code_offset).collect();
        assert_eq!(offsets, vec![0, 0]);
    }

    #[test]
    fn wide_forms_are_chosen() {
        let mut code = static_body(vec![]);
        let mut pool = ConstantPool::new();
        let last_integer = (0..300)
            .map(|i| pool.add_integer(i).unwrap())
            .last()
            .unwrap();
        let mut builder = CodeBuilder::new(&mut code, &mut pool);
        for _ in 0..=300 {
            builder.alloc_local(FieldType::int()).unwrap();
        }
        builder
            .push_instruction(Instruction::ILoad(300))
            .unwrap()
            .push_instruction(Instruction::Ldc(last_integer))
            .unwrap()
            .push_instruction(Instruction::IAdd)
            .unwrap()
            .push_instruction(Instruction::IStore(2))
            .unwrap();

        assert_eq!(
            code.bytecode(),
            &[0xc4, 0x15, 0x01, 0x2c, 0x13, 0x01, 0x2c, 0x60, 0x3d]
        );
        assert_eq!(code.max_locals(), 301);
        assert_eq!(code.max_stack(), 2);
    }

    #[test]
    fn max_stack_through_calls() {
        let mut code = static_body(vec![FieldType::array(FieldType::string())]);
        let mut pool = ConstantPool::new();
        let out = pool
            .add_fieldref("java/lang/System", "out", &FieldType::object("java/io/PrintStream"))
            .unwrap();
        let println = pool
            .add_methodref(
                "java/io/PrintStream",
                "println",
                &MethodDescriptor {
                    parameters: vec![FieldType::string()],
                    return_type: None,
                },
            )
            .unwrap();
        let hello = pool.add_string("Hello").unwrap();

        let mut builder = CodeBuilder::new(&mut code, &mut pool);
        builder
            .push_instruction(Instruction::GetStatic(out))
            .unwrap()
            .push_instruction(Instruction::Ldc(hello.into()))
            .unwrap();
        assert_eq!(
            builder.current_frame().stack,
            vec![FieldType::object("java/io/PrintStream"), FieldType::string()]
        );
        builder
            .push_instruction(Instruction::InvokeVirtual(println))
            .unwrap()
            .push_branch_instruction(BranchInstruction::Return)
            .unwrap();

        assert!(builder.current_frame().stack.is_empty());
        assert_eq!(code.max_stack(), 2);
        assert_eq!(code.max_locals(), 1);
    }

    #[test]
    fn arrays() {
        let mut code = static_body(vec![]);
        let mut pool = ConstantPool::new();
        let string_class = pool.add_class("java/lang/String").unwrap();
        let mut builder = CodeBuilder::new(&mut code, &mut pool);
        builder
            .push_instruction(Instruction::IConst3)
            .unwrap()
            .push_instruction(Instruction::ANewArray(string_class))
            .unwrap()
            .push_instruction(Instruction::IConst0)
            .unwrap()
            .push_instruction(Instruction::AALoad)
            .unwrap();
        assert_eq!(builder.current_frame().stack, vec![FieldType::string()]);

        builder
            .push_instruction(Instruction::Pop)
            .unwrap()
            .push_instruction(Instruction::IConst1)
            .unwrap()
            .push_instruction(Instruction::NewArray(BaseType::Byte))
            .unwrap()
            .push_instruction(Instruction::ArrayLength)
            .unwrap();
        assert_eq!(builder.current_frame().stack, vec![FieldType::int()]);

        assert!(matches!(
            builder.push_instruction(Instruction::ArrayLength),
            Err(Error::VerifierError {
                kind: VerifierErrorKind::NotArrayType,
                ..
            })
        ));
    }

    #[test]
    fn stack_underflow() {
        let mut code = static_body(vec![FieldType::int()]);
        let mut pool = ConstantPool::new();
        let mut builder = CodeBuilder::new(&mut code, &mut pool);
        builder.push_instruction(Instruction::ILoad(0)).unwrap();
        match builder.push_instruction(Instruction::IAdd) {
            Err(Error::VerifierError { instruction, kind }) => {
                assert_eq!(instruction, "IAdd");
                assert!(matches!(kind, VerifierErrorKind::EmptyStack));
            }
            other => panic!("expected a verifier error, found {:?}", other.map(|_| ())),
        }
        assert!(matches!(
            builder.push_instruction(Instruction::ILoad(1)),
            Err(Error::VerifierError {
                kind: VerifierErrorKind::InvalidIndex(1),
                ..
            })
        ));
    }

    #[test]
    fn ldc_of_non_loadable_constant() {
        let mut code = static_body(vec![]);
        let mut pool = ConstantPool::new();
        let utf8 = pool.add_utf8("nope").unwrap();
        let mut builder = CodeBuilder::new(&mut code, &mut pool);
        assert!(matches!(
            builder.push_instruction(Instruction::Ldc(utf8.into())),
            Err(Error::VerifierError {
                kind: VerifierErrorKind::NotLoadableConstant(ConstantIndex(1)),
                ..
            })
        ));
        assert!(matches!(
            builder.push_instruction(Instruction::Ldc(ConstantIndex(7))),
            Err(Error::VerifierError {
                kind: VerifierErrorKind::MissingConstant(ConstantIndex(7)),
                ..
            })
        ));
    }

    #[test]
    fn labels_must_be_placed_once() {
        let mut code = static_body(vec![]);
        let mut pool = ConstantPool::new();
        let mut builder = CodeBuilder::new(&mut code, &mut pool);
        let placed = builder.fresh_label();
        let never_placed = builder.fresh_label();
        builder.place_label(placed).unwrap();
        assert!(matches!(
            builder.place_label(placed),
            Err(Error::DuplicateLabel(label)) if label == placed
        ));
        builder
            .push_branch_instruction(BranchInstruction::Goto(never_placed))
            .unwrap();

        assert!(matches!(
            code.serialize_code(&mut pool),
            Err(Error::UnplacedLabel(label)) if label == never_placed
        ));
    }

    #[test]
    fn labels_after_goto_restart_from_parent() {
        let mut code = static_body(vec![FieldType::int()]);
        let mut pool = ConstantPool::new();
        let mut builder = CodeBuilder::new(&mut code, &mut pool);
        let (start, other, end) = (
            builder.fresh_label(),
            builder.fresh_label(),
            builder.fresh_label(),
        );
        builder
            .place_label(start)
            .unwrap()
            .push_instruction(Instruction::IConst1)
            .unwrap()
            .push_branch_instruction(BranchInstruction::Goto(end))
            .unwrap()
            .place_label_from(other, start)
            .unwrap();
        assert!(builder.current_frame().stack.is_empty());
        assert_eq!(builder.current_frame().code_offset, 4);

        builder
            .push_instruction(Instruction::IConst2)
            .unwrap()
            .place_label(end)
            .unwrap()
            .push_instruction(Instruction::IStore(0))
            .unwrap()
            .push_branch_instruction(BranchInstruction::Return)
            .unwrap();
        assert_eq!(code.max_stack(), 1);
    }

    #[test]
    fn stack_map_table_gets_branch_frames() {
        let mut code = static_body(vec![FieldType::int()]);
        let mut pool = ConstantPool::new();
        let mut builder = CodeBuilder::new(&mut code, &mut pool);
        let skip = builder.fresh_label();
        builder
            .add_stack_map_table()
            .unwrap()
            .push_instruction(Instruction::ILoad(0))
            .unwrap()
            .push_branch_instruction(BranchInstruction::If(OrdComparison::NE, skip))
            .unwrap()
            .push_instruction(Instruction::IInc(0, 1))
            .unwrap()
            .place_label(skip)
            .unwrap()
            .push_branch_instruction(BranchInstruction::Return)
            .unwrap();

        assert!(code.has_attribute(AttributeKind::StackMapTable));
        let lowered = code.serialize_code(&mut pool).unwrap();
        assert_eq!(lowered.attributes.len(), 1);
        assert_eq!(pool.utf8(lowered.attributes[0].name_index), Some("StackMapTable"));

        // One full frame at offset 7 (delta 7), with the `int` parameter as its only local
        assert_eq!(
            lowered.attributes[0].info,
            vec![0, 1, 255, 0, 7, 0, 1, 1, 0, 0]
        );
        assert_eq!(code.stack_map_table().unwrap().frames().len(), 2);
    }

    fn frame_offsets(code: &Code) -> Vec<u16> {
        code.frames().iter().map(|frame| frame.code_offset).collect()
    }

    #[test]
    fn loop_ending_in_goto() {
        let mut code = static_body(vec![]);
        let mut pool = ConstantPool::new();
        let mut builder = CodeBuilder::new(&mut code, &mut pool);
        let top = builder.fresh_label();
        builder
            .add_stack_map_table()
            .unwrap()
            .push_instruction(Instruction::IConst0)
            .unwrap()
            .push_instruction(Instruction::Pop)
            .unwrap()
            .place_label(top)
            .unwrap()
            .push_instruction(Instruction::IConst1)
            .unwrap()
            .push_instruction(Instruction::Pop)
            .unwrap()
            .push_branch_instruction(BranchInstruction::Goto(top))
            .unwrap();

        let lowered = code.serialize_code(&mut pool).unwrap();
        assert_eq!(lowered.code_array.0.len(), 7);
        assert_eq!(frame_offsets(&code), vec![0, 2]);
        assert_eq!(lowered.attributes[0].info, vec![0, 1, 255, 0, 2, 0, 0, 0, 0]);
    }

    #[test]
    fn code_after_goto_gets_a_frame() {
        let mut code = static_body(vec![]);
        let mut pool = ConstantPool::new();
        let mut builder = CodeBuilder::new(&mut code, &mut pool);
        let end = builder.fresh_label();
        builder
            .push_branch_instruction(BranchInstruction::Goto(end))
            .unwrap();
        assert_eq!(frame_offsets(builder.code()), vec![0]);

        builder
            .push_branch_instruction(BranchInstruction::Return)
            .unwrap()
            .place_label(end)
            .unwrap()
            .push_branch_instruction(BranchInstruction::Return)
            .unwrap();
        assert_eq!(frame_offsets(&code), vec![0, 3, 4]);
    }

    #[test]
    fn if_else_with_value() {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut code = static_body(vec![FieldType::int()]);
        let mut pool = ConstantPool::new();
        let mut builder = CodeBuilder::new(&mut code, &mut pool);
        let (els, end) = (builder.fresh_label(), builder.fresh_label());
        builder
            .add_stack_map_table()
            .unwrap()
            .push_instruction(Instruction::ILoad(0))
            .unwrap()
            .push_branch_instruction(BranchInstruction::If(OrdComparison::EQ, els))
            .unwrap()
            .push_instruction(Instruction::IConst1)
            .unwrap()
            .push_branch_instruction(BranchInstruction::Goto(end))
            .unwrap()
            .place_label(els)
            .unwrap();

        // The `else` branch starts from the frame of the jump, not the one left by `iconst_1`
        assert!(builder.current_frame().stack.is_empty());

        builder
            .push_instruction(Instruction::IConst2)
            .unwrap()
            .place_label(end)
            .unwrap()
            .push_branch_instruction(BranchInstruction::IReturn)
            .unwrap();

        let lowered = code.serialize_code(&mut pool).unwrap();
        assert_eq!(frame_offsets(&code), vec![0, 8, 9]);
        assert_eq!(
            lowered.attributes[0].info,
            vec![0, 2, 255, 0, 8, 0, 1, 1, 0, 0, 255, 0, 0, 0, 1, 1, 0, 1, 1]
        );
    }

    #[test]
    fn incompatible_frames_at_label() {
        let mut code = static_body(vec![FieldType::int()]);
        let mut pool = ConstantPool::new();
        let mut builder = CodeBuilder::new(&mut code, &mut pool);
        let (end, top) = (builder.fresh_label(), builder.fresh_label());
        builder
            .push_instruction(Instruction::ILoad(0))
            .unwrap()
            .push_branch_instruction(BranchInstruction::If(OrdComparison::EQ, end))
            .unwrap()
            .push_instruction(Instruction::IConst1)
            .unwrap();

        // Falls through with an `int` on the stack, but was jumped to with an empty stack
        match builder.place_label(end) {
            Err(Error::IncompatibleFrames {
                label,
                found,
                expected,
            }) => {
                assert_eq!(label, end);
                assert_eq!(found.stack, vec![FieldType::int()]);
                assert!(expected.stack.is_empty());
            }
            other => panic!("expected incompatible frames, found {:?}", other.map(|_| ())),
        }
        assert_eq!(builder.code().label_offset(end), None);

        // Jumping back to a placed label is checked against its frame too
        builder
            .push_instruction(Instruction::Pop)
            .unwrap()
            .place_label(end)
            .unwrap()
            .place_label(top)
            .unwrap()
            .push_instruction(Instruction::IConst1)
            .unwrap();
        assert!(matches!(
            builder.push_branch_instruction(BranchInstruction::Goto(top)),
            Err(Error::IncompatibleFrames { label, .. }) if label == top
        ));
        assert_eq!(builder.code().bytecode().len(), 7);
        assert_eq!(builder.current_frame().stack, vec![FieldType::int()]);
    }

    #[test]
    fn rejected_label_leaves_frame_alone() {
        let mut code = static_body(vec![]);
        let mut pool = ConstantPool::new();
        let mut builder = CodeBuilder::new(&mut code, &mut pool);
        let start = builder.fresh_label();
        builder
            .place_label(start)
            .unwrap()
            .push_instruction(Instruction::IConst1)
            .unwrap();
        assert!(matches!(
            builder.place_label_from(start, start),
            Err(Error::DuplicateLabel(label)) if label == start
        ));
        assert_eq!(builder.current_frame().stack, vec![FieldType::int()]);
        assert_eq!(builder.code().frames().len(), 2);
    }
}
