use crate::jvm::class_file;
use crate::jvm::class_file::{ConstantPool, StackMapFrame};
use crate::jvm::model::Frame;
use crate::jvm::Error;

/// Verification frames of a method body
///
/// Holds the frames at branch targets, sorted by offset. These are only compressed into the
/// format's delta encoding when the attribute is lowered.
#[derive(Debug, Default, Clone)]
pub struct StackMapTable {
    frames: Vec<Frame>,
}

impl StackMapTable {
    pub fn new() -> StackMapTable {
        StackMapTable::default()
    }

    pub fn set_frames(&mut self, frames: Vec<Frame>) {
        self.frames = frames;
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn serialize_stack_map_table(
        &self,
        constants: &mut ConstantPool,
    ) -> Result<class_file::StackMapTable, Error> {
        Ok(class_file::StackMapTable(compress_frames(&self.frames, constants)?))
    }
}

/// Turn frames into the entries of a `StackMapTable`
///
///   - frames at offset 0 describe the method entry, which the JVM already knows about
///   - when several frames share an offset, the last one wins
///   - the first entry's delta is its offset and every later delta is one less than the
///     distance from the previous entry
///
/// Frames must be in non-decreasing offset order. This is checked before anything is added to the
/// constant pool, so a failure leaves the pool untouched.
pub fn compress_frames(
    frames: &[Frame],
    constants: &mut ConstantPool,
) -> Result<Vec<StackMapFrame>, Error> {
    for pair in frames.windows(2) {
        let (previous, offset) = (pair[0].code_offset, pair[1].code_offset);
        if offset < previous {
            log::error!(
                "stack map frame at offset {} follows a frame at offset {}",
                offset,
                previous
            );
            return Err(Error::DescendingFrameOffset { previous, offset });
        }
    }

    let mut selected: Vec<&Frame> = vec![];
    for frame in frames.iter().filter(|frame| frame.code_offset != 0) {
        if selected.last().map_or(false, |last| last.code_offset == frame.code_offset) {
            selected.pop();
        }
        selected.push(frame);
    }

    let mut encoded = Vec::with_capacity(selected.len());
    let mut previous: Option<u16> = None;
    for frame in selected {
        let offset_delta = match previous {
            None => frame.code_offset,
            Some(previous) => frame.code_offset - previous - 1,
        };
        log::trace!(
            "full frame at offset {} (delta {})",
            frame.code_offset,
            offset_delta
        );
        encoded.push(frame.full_frame(offset_delta, constants)?);
        previous = Some(frame.code_offset);
    }
    Ok(encoded)
}
