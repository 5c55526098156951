//! Shape-driven wire marshalling generator
//!
//! Given a [`ShapeModel`] loaded from a service definition and a
//! [`NamingRegistry`], the [`Generator`] emits Rust functions that serialize
//! an operation's input into [`runtime::RequestParts`] and parse
//! [`runtime::ResponseParts`] into its output. Plans can also be executed
//! directly with [`eval`].

mod bindings;
pub mod config;
mod decode_json;
mod decode_xml;
mod encode_json;
mod encode_query;
mod encode_xml;
pub mod error;
pub mod eval;
pub mod fragment;
mod generator;
mod render;
pub mod runtime;
mod walk;
mod writer;

pub use error::{Error, Result};
pub use generator::Generator;
pub use render::RUNTIME;
pub use shapegen_model::{
    DefaultNamingRegistry, NamingRegistry, Operation, Protocol, Role, ShapeModel,
};

pub(crate) mod strings {
    pub use inflector::cases::snakecase::to_snake_case;
}
