//! # Style Compiler Native
//!
//! Compile-time style inlining for JSX mini-program components.
//!
//! ## Pipeline
//!
//! 1. **parse**: oxc parses the component. The default-exported render output is
//!    lowered into an owned element tree (`ComponentIR`). Stylesheet and
//!    native-component imports are recorded.
//! 2. **class_list / value / color**: every static `className` is tokenized.
//!    Arbitrary values such as `bg-[rgba(0,0,0,0.5)]` are parsed, and colors are
//!    validated and normalized (`#00000080`).
//! 3. **stylesheet / utility / resolve**: companion stylesheet rules
//!    (specificity, then source order) and utility expansions become one
//!    declaration list per element.
//! 4. **transform**: declarations are written back as `style` attributes.
//!    Inline values always win.
//!
//! ## Invariants
//!
//! 1. Elements are keyed by the byte offset of their opening tag. The same key
//!    is used by `parse`, `resolve` and `transform`.
//! 2. A `compileMode` attribute marks its element and every descendant. With
//!    `compileMode`-only output, nothing outside those subtrees is touched.
//! 3. Errors carry a stable `S-ERR-*` code and a location. Problems inside one
//!    class string are diagnostics. Only unparseable sources and stylesheets
//!    fail the transform.

#[cfg(feature = "napi")]
use napi_derive::napi;

pub mod cache;
pub mod class_list;
pub mod color;
pub mod discovery;
pub mod parse;
pub mod resolve;
pub mod stylesheet;
pub mod transform;
pub mod utility;
pub mod validate;
pub mod value;
pub mod visitor;

#[cfg(test)]
mod fixture_tests;
#[cfg(test)]
mod parse_tests;

pub use cache::IncrementalCache;
pub use class_list::{parse_class_list, ClassKind, ClassList, ClassToken};
pub use color::{ColorFormat, Rgba};
pub use discovery::{find_component_files, transform_directory, transform_file, BatchReport};
pub use parse::parse_component;
pub use resolve::{resolve_styles, ResolvedStyle, StyleResolution};
pub use stylesheet::{parse_stylesheet, StyleDeclaration, StyleSheet};
pub use transform::{transform_source, TransformOptions, TransformOutput};
pub use value::{parse_value, ArbitraryValue, FunctionCall};
pub use validate::*;

#[cfg(feature = "napi")]
pub use transform::transform_native;

#[cfg(feature = "napi")]
#[napi]
pub fn compile_bridge() -> String {
    "Style Native Bridge Connected".to_string()
}
