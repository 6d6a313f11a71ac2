//! # Label Service
//!
//! The request surface shared by the HTTP API and the CLI. A request goes
//! through the same steps whether it is previewed or printed:
//!
//! 1. resolve the printer and its merged profile
//! 2. resolve the media size and its pixel dimensions
//! 3. compose the template on a canvas of that size
//! 4. (print only) submit the PNG with the protocol media name
//!
//! The label configuration is read once per request. That snapshot is
//! used for every step above and travels with the [`RenderedLabel`], so a
//! concurrent reload never mixes two configurations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::compose::{ComposedLabel, Composer, ElementFailure};
use crate::config::{LabelConfig, Orientation};
use crate::binding::RequestData;
use crate::error::{ConfigErrorCode, EtiquetaError};
use crate::job::{JobAssembler, JobReport, PrintJob};
use crate::media::MediaResolver;
use crate::printer::{MediaSize, PrinterProfile};
use crate::render::RenderContext;
use crate::template::{Template, TemplateStore};

/// Overrides and data of one label request.
#[derive(Debug, Clone, Default)]
pub struct LabelRequest {
    pub printer: Option<String>,
    pub size: Option<String>,
    pub orientation: Option<Orientation>,
    pub data: RequestData,
}

/// A composed label together with what it was composed for.
#[derive(Debug, Clone)]
pub struct RenderedLabel {
    /// Configuration snapshot the label was resolved against.
    pub config: Arc<LabelConfig>,
    pub profile: Arc<PrinterProfile>,
    pub media: MediaSize,
    pub orientation: Orientation,
    pub label: ComposedLabel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintOptions {
    pub quantity: u32,
    /// Refuse to print a label with failed elements.
    pub strict: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            quantity: 1,
            strict: false,
        }
    }
}

/// Result of a print request.
#[derive(Debug, Clone, Serialize)]
pub struct PrintOutcome {
    pub printer: String,
    pub media: MediaSize,
    /// Media option sent with the job.
    pub media_option: Option<String>,
    /// `None` when nothing was submitted.
    pub report: Option<JobReport>,
    pub element_errors: Vec<ElementFailure>,
}

impl PrintOutcome {
    pub fn submitted(&self) -> bool {
        self.report.is_some()
    }
}

/// Parameters of a plain text label.
#[derive(Debug, Clone, Default)]
pub struct TextLabel {
    pub text: String,
    pub font_size: Option<u32>,
    pub align: Option<String>,
}

pub struct LabelService {
    resolver: MediaResolver,
    composer: Composer,
    jobs: JobAssembler,
    templates: TemplateStore,
    config_path: Option<PathBuf>,
}

impl LabelService {
    pub fn new(
        resolver: MediaResolver,
        composer: Composer,
        jobs: JobAssembler,
        templates: TemplateStore,
    ) -> Self {
        Self {
            resolver,
            composer,
            jobs,
            templates,
            config_path: None,
        }
    }

    /// File re-read by [`LabelService::reload_config`].
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn resolver(&self) -> &MediaResolver {
        &self.resolver
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    pub async fn printers(&self) -> Vec<String> {
        self.resolver.printers().await
    }

    pub async fn resolve_printer(&self, name: Option<&str>) -> Result<Arc<PrinterProfile>, EtiquetaError> {
        self.resolver.resolve_printer_profile(name).await
    }

    pub async fn resolve_media_size(
        &self,
        profile: &PrinterProfile,
        size: Option<&str>,
    ) -> Result<MediaSize, EtiquetaError> {
        self.resolver.resolve_media_size(profile, size).await
    }

    async fn render_context(
        &self,
        request: &LabelRequest,
    ) -> Result<(Arc<LabelConfig>, RenderContext), EtiquetaError> {
        let config = self.resolver.snapshot().await;
        let profile = self
            .resolver
            .resolve_printer_profile_in(&config, request.printer.as_deref())
            .await?;
        let media = self
            .resolver
            .resolve_media_size_in(&config, &profile, request.size.as_deref())?;
        let offset = config
            .printer
            .direct_print
            .then(|| config.label_offset(&media.key));

        let ctx = RenderContext::new(profile, media, request.data.clone())
            .with_orientation(request.orientation.unwrap_or(config.label.default_orientation))
            .with_default_font_size(config.default_font_size())
            .with_offset(offset);
        Ok((config, ctx))
    }

    async fn compose_in(
        &self,
        template: &Template,
        config: Arc<LabelConfig>,
        ctx: RenderContext,
    ) -> Result<RenderedLabel, EtiquetaError> {
        let label = self.composer.compose(template, &ctx).await?;
        Ok(RenderedLabel {
            config,
            profile: ctx.profile,
            media: ctx.media,
            orientation: ctx.orientation,
            label,
        })
    }

    pub async fn compose_label(
        &self,
        template: &Template,
        request: &LabelRequest,
    ) -> Result<RenderedLabel, EtiquetaError> {
        let (config, ctx) = self.render_context(request).await?;
        self.compose_in(template, config, ctx).await
    }

    /// Template of one auto-fitted text element sized to the request's media.
    fn text_template(text: &TextLabel, ctx: &RenderContext) -> Template {
        let (width, height) = ctx
            .media
            .dimensions()
            .unwrap_or(crate::media::FALLBACK_DIMENSIONS);
        let (width, height) = match ctx.orientation {
            Orientation::Standard => (width, height),
            Orientation::Rotated => (height, width),
        };
        Template::simple_text(
            &text.text,
            width,
            height,
            text.font_size.unwrap_or(ctx.default_font_size),
            text.align.as_deref().unwrap_or("center"),
        )
    }

    pub async fn compose_text(
        &self,
        text: &TextLabel,
        request: &LabelRequest,
    ) -> Result<RenderedLabel, EtiquetaError> {
        let (config, ctx) = self.render_context(request).await?;
        let template = Self::text_template(text, &ctx);
        self.compose_in(&template, config, ctx).await
    }

    pub async fn print(
        &self,
        template: &Template,
        request: &LabelRequest,
        options: PrintOptions,
    ) -> Result<PrintOutcome, EtiquetaError> {
        let rendered = self.compose_label(template, request).await?;
        let title = template.name.clone().unwrap_or_else(|| "label".to_string());
        self.submit(rendered, title, options).await
    }

    pub async fn print_text(
        &self,
        text: &TextLabel,
        request: &LabelRequest,
        options: PrintOptions,
    ) -> Result<PrintOutcome, EtiquetaError> {
        let rendered = self.compose_text(text, request).await?;
        self.submit(rendered, "text label".to_string(), options).await
    }

    async fn submit(
        &self,
        rendered: RenderedLabel,
        title: String,
        options: PrintOptions,
    ) -> Result<PrintOutcome, EtiquetaError> {
        let element_errors = rendered.label.failures();
        let media_option = if rendered.config.printer.direct_print {
            None
        } else {
            Some(self.resolver.protocol_media_name_in(
                &rendered.config,
                &rendered.profile,
                &rendered.media.key,
            ))
        };

        if options.strict && !element_errors.is_empty() {
            tracing::warn!(
                printer = %rendered.profile.name,
                failed = element_errors.len(),
                "strict print refused"
            );
            return Ok(PrintOutcome {
                printer: rendered.profile.name.clone(),
                media: rendered.media,
                media_option,
                report: None,
                element_errors,
            });
        }

        let job = PrintJob {
            printer: rendered.profile.name.clone(),
            document: rendered.label.to_png()?,
            media: media_option.clone(),
            quantity: options.quantity,
            title,
        };
        let report = self.jobs.submit(&job).await;

        Ok(PrintOutcome {
            printer: job.printer,
            media: rendered.media,
            media_option,
            report: Some(report),
            element_errors,
        })
    }

    /// Re-read the label configuration file and publish it.
    ///
    /// Returns the validation warnings for the new configuration.
    pub async fn reload_config(&self) -> Result<Vec<String>, EtiquetaError> {
        let path = self.config_path.as_deref().ok_or_else(|| {
            EtiquetaError::config(
                ConfigErrorCode::InvalidConfig,
                "no label configuration file to reload",
            )
        })?;
        self.reload_from(path).await
    }

    pub async fn reload_from(&self, path: &Path) -> Result<Vec<String>, EtiquetaError> {
        let config = LabelConfig::load(path)?;
        self.resolver.reload(config).await;
        let warnings = self.resolver.validate().await;
        for warning in &warnings {
            tracing::warn!("{}", warning);
        }
        Ok(warnings)
    }

    pub async fn validate(&self) -> Vec<String> {
        self.resolver.validate().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{BindingResolver, DEFAULT_FETCH_TIMEOUT};
    use crate::config::ConfigHandle;
    use crate::elements::ElementRegistry;
    use crate::printer::PrinterAttributes;
    use crate::transport::{MemoryPrinters, MemorySubmitter};
    use pretty_assertions::assert_eq;

    fn service(config_json: &str, submitter: Arc<MemorySubmitter>) -> LabelService {
        let config = LabelConfig::from_json_str(config_json).unwrap();
        let printers = MemoryPrinters::new()
            .with_printer(
                "Zebra",
                PrinterAttributes {
                    media_supported: vec!["w144h72".into()],
                    media_default: Some("w144h72".into()),
                    media_sizes: [("w144h72".to_string(), (5080, 2540))].into_iter().collect(),
                    resolution_default: Some(203),
                },
            )
            .with_default("Zebra");
        let resolver = MediaResolver::new(ConfigHandle::new(config), Arc::new(printers));
        let composer = Composer::new(
            Arc::new(ElementRegistry::with_builtins()),
            BindingResolver::new(DEFAULT_FETCH_TIMEOUT).unwrap(),
        );
        LabelService::new(resolver, composer, JobAssembler::new(submitter), TemplateStore::new("."))
    }

    #[tokio::test]
    async fn test_compose_text_uses_media_dimensions() {
        let svc = service(r#"{"PRINTER": {"USE_CUPS": true}}"#, Arc::new(MemorySubmitter::new(true)));
        let rendered = svc
            .compose_text(
                &TextLabel {
                    text: "Hello".into(),
                    ..TextLabel::default()
                },
                &LabelRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(rendered.profile.name, "Zebra");
        assert_eq!(rendered.media.key, "w144h72");
        assert_eq!(rendered.label.dimensions(), (406, 203));
        assert!(rendered.label.errors().is_empty());
    }

    #[tokio::test]
    async fn test_print_sends_reported_media_name() {
        let submitter = Arc::new(MemorySubmitter::new(true));
        let svc = service(r#"{"PRINTER": {"USE_CUPS": true}}"#, submitter.clone());
        let outcome = svc
            .print(
                &Template::simple_text("Hi", 100, 50, 20, "left"),
                &LabelRequest::default(),
                PrintOptions { quantity: 2, strict: false },
            )
            .await
            .unwrap();

        assert_eq!(outcome.media_option.as_deref(), Some("w144h72"));
        assert_eq!(outcome.report.as_ref().map(|r| r.succeeded), Some(2));
        assert_eq!(submitter.submissions()[0].copies, 2);
    }

    #[tokio::test]
    async fn test_direct_workflow_sends_no_media_and_applies_offset() {
        let submitter = Arc::new(MemorySubmitter::new(true));
        let svc = service(
            r#"{"PRINTER": {
                "USE_CUPS": true,
                "USE_NEW_PRINT_WORKFLOW": true,
                "LABEL_PRINTABLE_AREA": {
                    "w144h72": {"dimensions": [400, 200], "offset": {"enabled": true, "offset_x": 8, "offset_y": 4}}
                }
            }}"#,
            submitter.clone(),
        );
        let rendered = svc
            .compose_text(&TextLabel { text: "x".into(), ..TextLabel::default() }, &LabelRequest::default())
            .await
            .unwrap();
        assert_eq!(rendered.label.dimensions(), (414, 207));

        let outcome = svc
            .print_text(
                &TextLabel { text: "x".into(), ..TextLabel::default() },
                &LabelRequest::default(),
                PrintOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.media_option, None);
        assert_eq!(submitter.submissions()[0].media, None);
    }

    #[tokio::test]
    async fn test_submission_uses_the_snapshot_the_label_was_composed_with() {
        let submitter = Arc::new(MemorySubmitter::new(true));
        let svc = service(r#"{"PRINTER": {"USE_CUPS": true}}"#, submitter.clone());
        let rendered = svc
            .compose_label(&Template::simple_text("Hi", 100, 50, 20, "left"), &LabelRequest::default())
            .await
            .unwrap();

        svc.resolver()
            .reload(LabelConfig::from_json_str(r#"{"PRINTER": {"USE_CUPS": true, "USE_NEW_PRINT_WORKFLOW": true}}"#).unwrap())
            .await;

        let outcome = svc
            .submit(rendered, "label".to_string(), PrintOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome.media_option.as_deref(), Some("w144h72"));
        assert_eq!(submitter.submissions()[0].media.as_deref(), Some("w144h72"));
    }

    #[tokio::test]
    async fn test_oversized_label_size_is_rejected() {
        let svc = service(r#"{"PRINTER": {"USE_CUPS": true}}"#, Arc::new(MemorySubmitter::new(true)));
        let request = LabelRequest {
            size: Some("99999x99999in".into()),
            ..LabelRequest::default()
        };
        let err = svc
            .compose_text(&TextLabel { text: "x".into(), ..TextLabel::default() }, &request)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "malformed_size");
    }

    #[tokio::test]
    async fn test_strict_print_refuses_failed_elements() {
        let submitter = Arc::new(MemorySubmitter::new(true));
        let svc = service(r#"{"PRINTER": {"USE_CUPS": true}}"#, submitter.clone());
        let template = Template::from_json_str(r#"{"elements": [{"type": "hologram"}]}"#).unwrap();

        let outcome = svc
            .print(&template, &LabelRequest::default(), PrintOptions { quantity: 1, strict: true })
            .await
            .unwrap();
        assert!(!outcome.submitted());
        assert_eq!(outcome.element_errors.len(), 1);
        assert!(submitter.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_reload_without_path_is_an_error() {
        let svc = service("{}", Arc::new(MemorySubmitter::new(true)));
        assert_eq!(svc.reload_config().await.unwrap_err().code(), "invalid_config");
    }

    #[tokio::test]
    async fn test_reload_from_file_invalidates_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"PRINTER": {"USE_CUPS": false, "PRINTER": "Office"}}"#).unwrap();

        let svc = service(r#"{"PRINTER": {"USE_CUPS": true}}"#, Arc::new(MemorySubmitter::new(true)))
            .with_config_path(&path);
        assert_eq!(svc.resolve_printer(None).await.unwrap().name, "Zebra");

        svc.reload_config().await.unwrap();
        let profile = svc.resolve_printer(None).await.unwrap();
        assert_eq!(profile.name, "Office");
        assert!(!profile.metadata_available);
    }
}
