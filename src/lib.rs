//! # Etiqueta - Label Printing Library
//!
//! Etiqueta renders data-bound labels and prints them through CUPS. It
//! provides:
//!
//! - **Media resolution**: reconciles what the print service reports with
//!   the local label configuration (printer choice, size catalog, default
//!   size, pixel dimensions, media names)
//! - **Composition**: pluggable elements drawn onto a 1-bit canvas, each
//!   with its own data binding
//! - **Bindings**: literal text, `{{field}}` templates, payload lookups and
//!   remote JSON fetches
//! - **Job assembly**: native or repeated copies with per-attempt reporting
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use etiqueta::{
//!     binding::{BindingResolver, DEFAULT_FETCH_TIMEOUT},
//!     compose::Composer,
//!     config::{ConfigHandle, LabelConfig},
//!     elements::ElementRegistry,
//!     job::JobAssembler,
//!     media::MediaResolver,
//!     service::{LabelRequest, LabelService},
//!     template::{Template, TemplateStore},
//!     transport::CupsCli,
//! };
//!
//! # async fn example() -> Result<(), etiqueta::EtiquetaError> {
//! let config = LabelConfig::load("config.json".as_ref())?;
//! let cups = Arc::new(CupsCli::new(None));
//!
//! let service = LabelService::new(
//!     MediaResolver::new(ConfigHandle::new(config), cups.clone()),
//!     Composer::new(
//!         Arc::new(ElementRegistry::with_builtins()),
//!         BindingResolver::new(DEFAULT_FETCH_TIMEOUT)?,
//!     ),
//!     JobAssembler::new(cups),
//!     TemplateStore::new("templates"),
//! );
//!
//! let template = Template::simple_text("Hello", 400, 200, 48, "center");
//! let rendered = service.compose_label(&template, &LabelRequest::default()).await?;
//! std::fs::write("label.png", rendered.label.to_png()?)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Label configuration and service settings |
//! | [`printer`] | Print service traits and printer profiles |
//! | [`media`] | Media resolution engine |
//! | [`template`] | Template model and store |
//! | [`binding`] | Data binding resolver |
//! | [`elements`] | Element plugins and registry |
//! | [`render`] | Canvas, fonts, text fitting, dithering |
//! | [`compose`] | Element composition pipeline |
//! | [`job`] | Print job assembly |
//! | [`service`] | Request surface shared by CLI and HTTP |
//! | [`server`] | HTTP API |
//! | [`transport`] | CUPS and in-memory print services |
//! | [`error`] | Error types |

pub mod binding;
pub mod compose;
pub mod config;
pub mod elements;
pub mod error;
pub mod job;
pub mod media;
pub mod printer;
pub mod render;
pub mod server;
pub mod service;
pub mod template;
pub mod transport;

// Re-exports for convenience
pub use error::EtiquetaError;
pub use service::LabelService;
