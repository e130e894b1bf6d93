// Failure normalization
// Converts the capture shapes handed over by execution engines into one
// canonical, transmissible form

use serde::Serialize;

/// One stack frame captured at failure time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackFrame {
    pub function: String,
    pub file: String,
    pub line: u32,
}

impl StackFrame {
    /// Create a frame
    pub fn new(function: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            function: function.into(),
            file: file.into(),
            line,
        }
    }
}

/// Error type of a captured failure, qualified by its defining module
///
/// Two modules may declare identically named error types; the qualified
/// form keeps them apart on the coordinator side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorClass {
    pub module: String,
    pub name: String,
}

impl ErrorClass {
    /// Create an error class
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }

    /// Module-qualified type name, e.g. `exceptions.ValueError`
    pub fn qualified(&self) -> String {
        if self.module.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.module, self.name)
        }
    }
}

/// A failure as handed to the reporter by an execution engine
///
/// Engines produce one of two shapes: the raw pieces grabbed at the point
/// of the raise, or a failure some earlier layer already normalized. Both
/// reduce to the same wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapturedError {
    /// Raw capture taken where the error was raised
    Raised {
        message: String,
        class: ErrorClass,
        trace: Vec<StackFrame>,
    },
    /// A failure an earlier layer already normalized
    Wrapped(NormalizedFailure),
}

impl CapturedError {
    /// Capture from the raw pieces at the raise site
    pub fn raised(message: impl Into<String>, class: ErrorClass, trace: Vec<StackFrame>) -> Self {
        Self::Raised {
            message: message.into(),
            class,
            trace,
        }
    }
}

/// Canonical form of one test failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedFailure {
    pub message: String,
    pub type_name: String,
    pub frames: Vec<StackFrame>,
}

impl NormalizedFailure {
    /// Create a normalized failure
    pub fn new(
        message: impl Into<String>,
        type_name: impl Into<String>,
        frames: Vec<StackFrame>,
    ) -> Self {
        Self {
            message: message.into(),
            type_name: type_name.into(),
            frames,
        }
    }

    /// Flatten the trace for the wire: three string entries per frame, in
    /// capture order, line numbers rendered as strings
    pub fn wire_frames(&self) -> Vec<String> {
        let mut flat = Vec::with_capacity(self.frames.len() * 3);
        for frame in &self.frames {
            flat.push(frame.function.clone());
            flat.push(frame.file.clone());
            flat.push(frame.line.to_string());
        }
        flat
    }
}

/// Normalize either capture shape into the canonical form
///
/// Total over its input: both variants always reduce, nothing fails.
pub fn normalize(error: &CapturedError) -> NormalizedFailure {
    match error {
        CapturedError::Raised {
            message,
            class,
            trace,
        } => NormalizedFailure {
            message: message.clone(),
            type_name: class.qualified(),
            frames: trace.clone(),
        },
        CapturedError::Wrapped(failure) => failure.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trace() -> Vec<StackFrame> {
        vec![
            StackFrame::new("run_case", "harness.rs", 42),
            StackFrame::new("do_raise", "case.rs", 7),
        ]
    }

    #[test]
    fn test_normalize_raised() {
        let error = CapturedError::raised(
            "boom",
            ErrorClass::new("exceptions", "ValueError"),
            sample_trace(),
        );
        let failure = normalize(&error);
        assert_eq!(failure.message, "boom");
        assert_eq!(failure.type_name, "exceptions.ValueError");
        assert_eq!(failure.frames, sample_trace());
    }

    #[test]
    fn test_normalize_wrapped_passes_through() {
        let wrapped = NormalizedFailure::new("boom", "exceptions.ValueError", sample_trace());
        let failure = normalize(&CapturedError::Wrapped(wrapped.clone()));
        assert_eq!(failure, wrapped);
    }

    #[test]
    fn test_both_shapes_reduce_to_the_same_form() {
        let raised = CapturedError::raised(
            "boom",
            ErrorClass::new("exceptions", "ValueError"),
            sample_trace(),
        );
        let wrapped = CapturedError::Wrapped(NormalizedFailure::new(
            "boom",
            "exceptions.ValueError",
            sample_trace(),
        ));
        assert_eq!(normalize(&raised), normalize(&wrapped));
    }

    #[test]
    fn test_qualified_name() {
        let class = ErrorClass::new("exceptions", "ValueError");
        assert_eq!(class.qualified(), "exceptions.ValueError");
    }

    #[test]
    fn test_qualified_name_without_module() {
        let class = ErrorClass::new("", "ValueError");
        assert_eq!(class.qualified(), "ValueError");
    }

    #[test]
    fn test_wire_frames_flatten_in_order() {
        let failure = NormalizedFailure::new("boom", "exceptions.ValueError", sample_trace());
        assert_eq!(
            failure.wire_frames(),
            vec!["run_case", "harness.rs", "42", "do_raise", "case.rs", "7"]
        );
    }

    #[test]
    fn test_wire_frames_empty_trace() {
        let failure = NormalizedFailure::new("boom", "exceptions.ValueError", Vec::new());
        assert!(failure.wire_frames().is_empty());
    }
}
