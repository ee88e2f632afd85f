// novelshelf services
// Services provide stateless or self-contained functionality: settings, formatters, reader layout, themes, navigation.

pub mod formatter;
pub mod json_formatter;
pub mod navigation;
pub mod reader_mode;
pub mod settings_engine;
pub mod theme_engine;
