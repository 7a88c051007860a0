pub mod plugin_dir;

pub use plugin_dir::PluginDir;
