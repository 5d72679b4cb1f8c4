//! Transform pipeline infrastructure
//!
//! Host files can be rewritten before literals are extracted from them, e.g. to pull the
//! script block out of a single file component or to normalize line endings. Rewrites are
//! named stages looked up in a [`StageRegistry`] and composed into one [`Transform`].
//!
//! # Architecture Overview
//!
//! ## The `Runnable` Trait
//!
//! The interface for a single step. Anything implementing `Runnable<I, O>` turns an `I`
//! into an `O`:
//!
//! ```rust,ignore
//! pub trait Runnable<I, O> {
//!     fn run(&self, input: I) -> Result<O, TransformError>;
//! }
//! ```
//!
//! ## The `Transform<I, O>` Type
//!
//! A boxed, shareable function that supports chaining with `.then()`. The compiler checks
//! that each stage's input type matches the previous output type:
//!
//! ```rust,ignore
//! let chain = Transform::<SourceText, SourceText>::identity()
//!     .then(NamedStage::new("strip-bom", strip_bom))
//!     .then(NamedStage::new("vue-script", vue_script));
//! let out = chain.run(SourceText::new("App.vue", text))?;
//! ```
//!
//! ## Named stages
//!
//! Source stages all have the shape `base dir -> (filename, text) -> text`. The
//! [`registry`] resolves names to factories of that shape and composes them left to right:
//! the first stage sees the file as read from disk, every later stage sees the previous
//! stage's output. An empty list composes to the identity.
//!
//! # Module Organization
//!
//! - [`registry`]: name to factory resolution and chain building
//! - [`stages`]: the built-in source stages

pub mod registry;
pub mod stages;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use registry::{StageFactory, StageRegistry};

/// Error that can occur while building a transform chain
#[derive(Debug, Clone, PartialEq)]
pub enum TransformError {
    /// A stage name did not resolve to a registered factory
    UnknownStage(String),
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformError::UnknownStage(name) => {
                write!(f, "Can not resolve transformer module \"{}\"", name)
            }
        }
    }
}

impl std::error::Error for TransformError {}

/// Trait for anything that can transform an input to an output
pub trait Runnable<I, O> {
    /// Execute this transformation on the input
    fn run(&self, input: I) -> Result<O, TransformError>;
}

/// A composable transformation pipeline
///
/// `Transform<I, O>` is cheap to clone and safe to share across threads, so one chain
/// built per run can be applied to every file concurrently.
pub struct Transform<I, O> {
    run_fn: Arc<dyn Fn(I) -> Result<O, TransformError> + Send + Sync>,
}

impl<I, O> Clone for Transform<I, O> {
    fn clone(&self) -> Self {
        Transform {
            run_fn: Arc::clone(&self.run_fn),
        }
    }
}

impl<I, O> Transform<I, O> {
    /// Create a new identity transform that passes input through unchanged
    ///
    /// Note: This only works when `I = O`
    pub fn identity() -> Self
    where
        I: 'static,
        O: From<I> + 'static,
    {
        Transform {
            run_fn: Arc::new(|input| Ok(O::from(input))),
        }
    }

    /// Create a transform from a function
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(I) -> Result<O, TransformError> + Send + Sync + 'static,
    {
        Transform {
            run_fn: Arc::new(f),
        }
    }

    /// Add a stage to this transform, returning a new transform with extended output type
    pub fn then<O2, S>(self, stage: S) -> Transform<I, O2>
    where
        S: Runnable<O, O2> + Send + Sync + 'static,
        I: 'static,
        O: 'static,
        O2: 'static,
    {
        let prev_run = self.run_fn;
        Transform {
            run_fn: Arc::new(move |input| {
                let intermediate = prev_run(input)?;
                stage.run(intermediate)
            }),
        }
    }

    /// Execute this transform on the given input
    pub fn run(&self, input: I) -> Result<O, TransformError> {
        (self.run_fn)(input)
    }
}

impl<I, O> Runnable<I, O> for Transform<I, O>
where
    I: 'static,
    O: 'static,
{
    fn run(&self, input: I) -> Result<O, TransformError> {
        Transform::run(self, input)
    }
}

/// A host file's text on its way through a source transform chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    pub filename: PathBuf,
    pub text: String,
}

impl SourceText {
    pub fn new(filename: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        SourceText {
            filename: filename.into(),
            text: text.into(),
        }
    }
}

/// A resolved source stage: `(filename, text) -> text`
pub type TextStage = Arc<dyn Fn(&Path, &str) -> String + Send + Sync>;

/// The composed chain applied to every host file before extraction
pub type SourceTransform = Transform<SourceText, SourceText>;

/// Adapts a [`TextStage`] to [`Runnable`], keeping its name for diagnostics
pub struct NamedStage {
    name: String,
    stage: TextStage,
}

impl NamedStage {
    pub fn new(name: impl Into<String>, stage: TextStage) -> Self {
        NamedStage {
            name: name.into(),
            stage,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Runnable<SourceText, SourceText> for NamedStage {
    fn run(&self, input: SourceText) -> Result<SourceText, TransformError> {
        let text = (self.stage)(&input.filename, &input.text);
        Ok(SourceText {
            filename: input.filename,
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test helpers - simple stages for composition
    struct DoubleNumber;
    impl Runnable<i32, i32> for DoubleNumber {
        fn run(&self, input: i32) -> Result<i32, TransformError> {
            Ok(input * 2)
        }
    }

    struct AddTen;
    impl Runnable<i32, i32> for AddTen {
        fn run(&self, input: i32) -> Result<i32, TransformError> {
            Ok(input + 10)
        }
    }

    struct FailingStage;
    impl Runnable<i32, i32> for FailingStage {
        fn run(&self, _input: i32) -> Result<i32, TransformError> {
            Err(TransformError::UnknownStage("failing".to_string()))
        }
    }

    fn text_stage(f: fn(&str) -> String) -> TextStage {
        Arc::new(move |_: &Path, text: &str| f(text))
    }

    #[test]
    fn test_transform_from_fn() {
        let transform = Transform::from_fn(|x: i32| Ok(x * 2));
        assert_eq!(transform.run(5).unwrap(), 10);
    }

    #[test]
    fn test_stage_order_is_preserved() {
        let transform = Transform::from_fn(|x: i32| Ok(x))
            .then(DoubleNumber)
            .then(AddTen);
        let reversed = Transform::from_fn(|x: i32| Ok(x))
            .then(AddTen)
            .then(DoubleNumber);

        assert_eq!(transform.run(5).unwrap(), 20);
        assert_eq!(reversed.run(5).unwrap(), 30);
    }

    #[test]
    fn test_error_propagation() {
        let transform = Transform::from_fn(|x: i32| Ok(x))
            .then(DoubleNumber)
            .then(FailingStage)
            .then(AddTen);

        assert_eq!(
            transform.run(5).unwrap_err(),
            TransformError::UnknownStage("failing".to_string())
        );
    }

    #[test]
    fn test_identity_source_transform() {
        let chain = SourceTransform::identity();
        let input = SourceText::new("a.js", "graphql`query Q { id }`");
        assert_eq!(chain.run(input.clone()).unwrap(), input);
    }

    #[test]
    fn test_named_stages_see_previous_output() {
        let chain = SourceTransform::identity()
            .then(NamedStage::new("upper", text_stage(|t| t.to_uppercase())))
            .then(NamedStage::new("suffix", text_stage(|t| format!("{}!", t))));

        let out = chain.run(SourceText::new("a.js", "abc")).unwrap();
        assert_eq!(out.text, "ABC!");
        assert_eq!(out.filename, PathBuf::from("a.js"));
    }

    #[test]
    fn test_clone_shares_the_chain() {
        let chain = SourceTransform::identity()
            .then(NamedStage::new("upper", text_stage(|t| t.to_uppercase())));
        let copy = chain.clone();
        assert_eq!(copy.run(SourceText::new("a", "x")).unwrap().text, "X");
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            TransformError::UnknownStage("nope".into()).to_string(),
            "Can not resolve transformer module \"nope\""
        );
    }
}
