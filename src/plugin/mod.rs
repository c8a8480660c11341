//! Render plugins: text hooks around the pipeline plus a mount hook for
//! whatever displays the rendered HTML.
//!
//! Plugins run in the order they were registered, both before Markdown
//! ([`RenderPlugin::pre_process`]) and after the last sanitizer
//! ([`RenderPlugin::post_process`]). Post-processed output is not
//! sanitized again, so plugins must only emit markup they control.

mod placeholder;

pub use placeholder::PlaceholderEmbedPlugin;

use std::fmt;
use std::sync::Arc;

/// The element tree a rendered document was mounted into.
///
/// Implemented by the host UI. Elements are addressed by their `id`.
pub trait MountTarget {
    /// Ids of the elements carrying `class`.
    fn element_ids_by_class(&self, class: &str) -> Vec<String>;

    fn set_attribute(&mut self, id: &str, name: &str, value: &str);
}

/// Undoes whatever a plugin set up in [`RenderPlugin::on_mount`].
///
/// Running it more than once is a no-op.
pub struct Cleanup(Option<Box<dyn FnOnce() + Send>>);

impl Cleanup {
    pub fn new(f: impl FnOnce() + Send + 'static) -> Self {
        Self(Some(Box::new(f)))
    }

    pub fn run(&mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }

    pub fn has_run(&self) -> bool {
        self.0.is_none()
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cleanup")
            .field("has_run", &self.has_run())
            .finish()
    }
}

/// A hook into rendering.
pub trait RenderPlugin: Send + Sync {
    /// Unique within one renderer.
    fn name(&self) -> &str;

    /// Runs on the raw input before anything else.
    fn pre_process(&self, text: &str) -> String {
        text.to_string()
    }

    /// Runs on the final HTML.
    fn post_process(&self, html: &str) -> String {
        html.to_string()
    }

    /// Called by the host once the HTML is in its element tree.
    fn on_mount(&self, _root: &mut dyn MountTarget) -> Option<Cleanup> {
        None
    }
}

/// The registered plugins, in order.
#[derive(Clone, Default)]
pub struct PluginChain {
    plugins: Vec<Arc<dyn RenderPlugin>>,
}

impl PluginChain {
    pub fn new(plugins: Vec<Arc<dyn RenderPlugin>>) -> Self {
        Self { plugins }
    }

    pub fn pre_process(&self, text: &str) -> String {
        self.plugins
            .iter()
            .fold(text.to_string(), |acc, p| p.pre_process(&acc))
    }

    pub fn post_process(&self, html: &str) -> String {
        self.plugins
            .iter()
            .fold(html.to_string(), |acc, p| p.post_process(&acc))
    }

    pub fn mount(&self, root: &mut dyn MountTarget) -> Vec<Cleanup> {
        self.plugins
            .iter()
            .filter_map(|p| {
                tracing::debug!("Mounting plugin {}", p.name());
                p.on_mount(root)
            })
            .collect()
    }
}

impl fmt::Debug for PluginChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.plugins.iter().map(|p| p.name()))
            .finish()
    }
}
