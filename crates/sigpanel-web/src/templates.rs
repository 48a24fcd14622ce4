//! Template Engine
//!
//! Handles HTML template rendering using minijinja.

use minijinja::{Environment, Error as MiniJinjaError};

/// Template manager
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    /// Create a new template manager
    ///
    /// Template names keep their `.html` suffix so minijinja escapes
    /// every interpolated value.
    pub fn new() -> Result<Self, MiniJinjaError> {
        let mut env = Environment::new();

        env.add_template("base.html", include_str!("../templates/base.html"))?;
        env.add_template("login.html", include_str!("../templates/login.html"))?;
        env.add_template("signature.html", include_str!("../templates/signature.html"))?;

        Ok(Self { env })
    }

    /// Render a template with context
    pub fn render(&self, name: &str, context: &serde_json::Value) -> Result<String, MiniJinjaError> {
        let template = self.env.get_template(name)?;
        template.render(context)
    }
}
