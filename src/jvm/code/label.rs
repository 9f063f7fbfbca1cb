use std::fmt;

/// Opaque jump target inside a method body
#[derive(Copy, Clone, Hash, Eq, PartialEq)]
pub struct Label(usize);

impl Label {
    /// First label handed out for a method
    pub const START: Label = Label(0);

    /// Get the next fresh label
    pub fn next(&self) -> Label {
        Label(self.0 + 1)
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_fmt(format_args!("l{}", self.0))
    }
}

/// Generates new labels
///
/// Cloning does not split the generator source - the cloned generator will produce the same
/// sequence of labels as the original.
#[derive(Clone, Debug)]
pub struct LabelGenerator(Label);

impl LabelGenerator {
    pub fn new(start: Label) -> LabelGenerator {
        LabelGenerator(start)
    }

    /// Generate a fresh label
    pub fn fresh_label(&mut self) -> Label {
        let to_return = self.0;
        self.0 = self.0.next();
        to_return
    }
}

impl Default for LabelGenerator {
    fn default() -> LabelGenerator {
        LabelGenerator::new(Label::START)
    }
}
