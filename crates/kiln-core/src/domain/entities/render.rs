//! Template rendering context.
//!
//! Every path and content template in the feature catalog is a plain string
//! with `{{VARIABLE}}` placeholders. [`RenderContext`] binds those variables
//! from a [`ScaffoldOptions`] record; no shell strings are ever assembled.
//!
//! ## Standard variables
//!
//! | Variable | Example | Source |
//! |----------|---------|--------|
//! | `PROJECT_NAME` | "My-App" | User input |
//! | `PROJECT_NAME_SNAKE` | "my_app" | Computed |
//! | `PROJECT_NAME_KEBAB` | "my-app" | Computed |
//! | `PROJECT_NAME_PASCAL` | "MyApp" | Computed |
//! | `PYTHON_VERSION` | "3.12" | Options |
//! | `PYTHON_TAG` | "py312" | Computed |
//! | `SOURCE_DIR` | "src" | Fixed |
//! | `PACKAGE_DIR` | "src/my_app" | Layout |
//! | `PACKAGE_MODULE` | "my_app" | Layout |

use std::collections::HashMap;

use crate::domain::value_objects::{Layout, ScaffoldOptions};

pub const SOURCE_DIR: &str = "src";

#[derive(Debug, Clone)]
pub struct RenderContext {
    variables: HashMap<String, String>,
}

impl RenderContext {
    /// Build a context with all standard variables derived from `options`.
    pub fn from_options(options: &ScaffoldOptions) -> Self {
        let name = options.project_name.as_str();
        let snake = to_snake_case(name);
        let (package_dir, package_module) = match options.layout {
            Layout::Flat => (SOURCE_DIR.to_string(), SOURCE_DIR.to_string()),
            Layout::Nested => (format!("{SOURCE_DIR}/{snake}"), snake.clone()),
        };

        let mut vars = HashMap::new();
        vars.insert("PROJECT_NAME".to_string(), name.to_string());
        vars.insert("PROJECT_NAME_SNAKE".to_string(), snake);
        vars.insert("PROJECT_NAME_KEBAB".to_string(), to_kebab_case(name));
        vars.insert("PROJECT_NAME_PASCAL".to_string(), to_pascal_case(name));
        vars.insert(
            "PYTHON_VERSION".to_string(),
            options.python_version.clone(),
        );
        vars.insert(
            "PYTHON_TAG".to_string(),
            options.python_tag(),
        );
        vars.insert("SOURCE_DIR".to_string(), SOURCE_DIR.to_string());
        vars.insert("PACKAGE_DIR".to_string(), package_dir);
        vars.insert("PACKAGE_MODULE".to_string(), package_module);

        Self { variables: vars }
    }

    /// Add a custom variable, consuming self and returning a new context.
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Get a variable value if it exists.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(|s| s.as_str())
    }

    /// Render a template string by replacing `{{VARIABLE}}` placeholders.
    ///
    /// Unknown placeholders are left as-is.
    pub fn render(&self, template: &str) -> String {
        let mut result = template.to_string();
        for (key, value) in &self.variables {
            let placeholder = format!("{{{{{key}}}}}");
            result = result.replace(&placeholder, value);
        }
        result
    }
}

// ============================================================================
// String Case Conversion Helpers
// ============================================================================

fn to_snake_case(s: &str) -> String {
    split_words(s).join("_")
}

fn to_kebab_case(s: &str) -> String {
    split_words(s).join("-")
}

fn to_pascal_case(s: &str) -> String {
    split_words(s)
        .into_iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => {
                    let mut out = String::new();
                    out.extend(first.to_uppercase());
                    out.push_str(chars.as_str());
                    out
                }
                None => String::new(),
            }
        })
        .collect()
}

/// Split a string into lowercase words on separators and case transitions.
///
/// `.` counts as a separator too, since it is legal in distribution names
/// but not in module names.
fn split_words(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '_' || c == '-' || c == '.' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(current.to_lowercase());
                current.clear();
            }
            continue;
        }

        if let Some(next) = chars.peek() {
            // "myApp" → "my" + "App"
            if c.is_lowercase() && next.is_uppercase() {
                current.push(c);
                words.push(current.to_lowercase());
                current.clear();
                continue;
            }

            // "HTTPServer" → "HTTP" + "Server"
            if c.is_uppercase()
                && next.is_uppercase()
                && chars.clone().nth(1).is_some_and(|n| n.is_lowercase())
            {
                current.push(c);
                words.push(current.to_lowercase());
                current.clear();
                continue;
            }
        }

        current.push(c);
    }

    if !current.is_empty() {
        words.push(current.to_lowercase());
    }

    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_layout_variables() {
        let ctx = RenderContext::from_options(&ScaffoldOptions::new("My-Data.App"));

        assert_eq!(ctx.get("PROJECT_NAME"), Some("My-Data.App"));
        assert_eq!(ctx.get("PROJECT_NAME_SNAKE"), Some("my_data_app"));
        assert_eq!(ctx.get("PROJECT_NAME_KEBAB"), Some("my-data-app"));
        assert_eq!(ctx.get("PROJECT_NAME_PASCAL"), Some("MyDataApp"));
        assert_eq!(ctx.get("PACKAGE_DIR"), Some("src/my_data_app"));
        assert_eq!(ctx.get("PACKAGE_MODULE"), Some("my_data_app"));
    }

    #[test]
    fn flat_layout_uses_src_as_package() {
        let opts = ScaffoldOptions::new("demo").with_layout(Layout::Flat);
        let ctx = RenderContext::from_options(&opts);

        assert_eq!(ctx.get("PACKAGE_DIR"), Some("src"));
        assert_eq!(ctx.get("PACKAGE_MODULE"), Some("src"));
    }

    #[test]
    fn python_tag_strips_dots() {
        let opts = ScaffoldOptions::new("demo").with_python_version("3.11");
        let ctx = RenderContext::from_options(&opts);
        assert_eq!(ctx.get("PYTHON_TAG"), Some("py311"));

        let opts = ScaffoldOptions::new("demo").with_python_version("3.12.1");
        let ctx = RenderContext::from_options(&opts);
        assert_eq!(ctx.get("PYTHON_TAG"), Some("py312"));
        assert_eq!(ctx.get("PYTHON_VERSION"), Some("3.12.1"));
    }

    #[test]
    fn render_replaces_known_and_keeps_unknown() {
        let ctx = RenderContext::from_options(&ScaffoldOptions::new("demo"))
            .with_variable("AUTHOR", "Alice");
        let out = ctx.render("{{PACKAGE_DIR}}/main.py by {{AUTHOR}} {{MISSING}}");
        assert_eq!(out, "src/demo/main.py by Alice {{MISSING}}");
    }

    #[test]
    fn split_words_handles_acronyms() {
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_kebab_case("myApp"), "my-app");
    }
}
