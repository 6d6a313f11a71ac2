//! # Element Composition
//!
//! Turns a template and a [`RenderContext`] into a label bitmap.
//!
//! ```text
//! Init ──► for each element (list order):
//!            Resolving ──► Rendering ──► Done
//!                │              │
//!                └──────────────┴──────► Failed (recorded)
//!      ──► Finalized (bitmap + per-element outcomes)
//! ```
//!
//! Init allocates the canvas at the media's pixel size (or the template's
//! own size) and fails the whole request only when that canvas is empty.
//! After that nothing aborts the label: an unknown type tag, an invalid
//! style, a failed binding or a failed draw marks that one element as
//! failed and the rest still render.
//!
//! Bindings of all elements are resolved concurrently; drawing happens
//! afterwards, one element at a time in list order, so later elements
//! paint over earlier ones.

use std::sync::Arc;

use futures::future::join_all;
use image::GrayImage;
use serde::Serialize;

use crate::binding::{BindingResolver, BoundValue};
use crate::elements::{Element, ElementRegistry, Geometry, Style};
use crate::error::{ElementError, EtiquetaError};
use crate::media::FALLBACK_DIMENSIONS;
use crate::render::{Canvas, RenderContext, encode_png};
use crate::template::Template;

/// What happened to one element.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementReport {
    /// Position in the template, which is also its z-order.
    pub index: usize,
    pub element_type: String,
    pub error: Option<ElementError>,
}

impl ElementReport {
    pub fn is_rendered(&self) -> bool {
        self.error.is_none()
    }
}

/// A failed element, as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementFailure {
    pub index: usize,
    pub element_type: String,
    pub error: String,
}

/// Finalized label.
#[derive(Debug, Clone)]
pub struct ComposedLabel {
    pub bitmap: GrayImage,
    pub elements: Vec<ElementReport>,
}

impl ComposedLabel {
    /// Failed elements, in template order.
    pub fn errors(&self) -> Vec<(usize, &ElementError)> {
        self.elements
            .iter()
            .filter_map(|r| r.error.as_ref().map(|e| (r.index, e)))
            .collect()
    }

    pub fn failures(&self) -> Vec<ElementFailure> {
        self.elements
            .iter()
            .filter_map(|r| {
                r.error.as_ref().map(|e| ElementFailure {
                    index: r.index,
                    element_type: r.element_type.clone(),
                    error: e.to_string(),
                })
            })
            .collect()
    }

    pub fn rendered_count(&self) -> usize {
        self.elements.iter().filter(|r| r.is_rendered()).count()
    }

    pub fn to_png(&self) -> Result<Vec<u8>, EtiquetaError> {
        encode_png(&self.bitmap)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.bitmap.dimensions()
    }
}

#[derive(Debug, Clone)]
pub struct Composer {
    registry: Arc<ElementRegistry>,
    bindings: BindingResolver,
}

impl Composer {
    pub fn new(registry: Arc<ElementRegistry>, bindings: BindingResolver) -> Self {
        Self { registry, bindings }
    }

    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    pub async fn compose(
        &self,
        template: &Template,
        ctx: &RenderContext,
    ) -> Result<ComposedLabel, EtiquetaError> {
        // Init
        let (width, height) = template
            .dimensions()
            .or_else(|| ctx.media.dimensions())
            .unwrap_or(FALLBACK_DIMENSIONS);
        let mut canvas = Canvas::with_offset(width, height, ctx.orientation, ctx.offset_pixels())?;

        let built: Vec<Result<Box<dyn Element>, ElementError>> = template
            .elements
            .iter()
            .map(|spec| {
                let style = Style::new(&spec.element_type, &spec.style)
                    .with_default_font_size(ctx.default_font_size);
                self.registry.create(&spec.element_type, &style)
            })
            .collect();

        // Resolving
        let values: Vec<Option<Result<BoundValue, ElementError>>> =
            join_all(template.elements.iter().zip(&built).map(|(spec, element)| async move {
                match element {
                    Ok(_) => Some(
                        self.bindings
                            .resolve(spec.binding.as_ref(), &ctx.data)
                            .await
                            .map_err(ElementError::from),
                    ),
                    Err(_) => None,
                }
            }))
            .await;

        // Rendering
        let mut reports = Vec::with_capacity(template.elements.len());
        for (index, ((spec, element), value)) in
            template.elements.iter().zip(built).zip(values).enumerate()
        {
            let outcome = element.and_then(|element| {
                let value = value.unwrap_or(Ok(BoundValue::Empty))?;
                let geometry = Geometry::of(spec, canvas.width(), canvas.height());
                let mut region = canvas.region(geometry.x, geometry.y, geometry.width, geometry.height);
                element.render(&geometry, &value, &mut region)
            });

            if let Err(e) = &outcome {
                tracing::warn!(index, element_type = %spec.element_type, error = %e, "element failed");
            }
            reports.push(ElementReport {
                index,
                element_type: spec.element_type.clone(),
                error: outcome.err(),
            });
        }

        // Finalized
        let label = ComposedLabel {
            bitmap: canvas.into_image(),
            elements: reports,
        };
        tracing::debug!(
            template = template.name.as_deref().unwrap_or("-"),
            rendered = label.rendered_count(),
            failed = label.elements.len() - label.rendered_count(),
            "label composed"
        );
        Ok(label)
    }
}
