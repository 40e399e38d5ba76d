//! Effect structure export for external tooling
//!
//! Serializes an effect's techniques, passes, variables, and annotations into
//! a tree-structured XML document. The output is deterministic for a given
//! effect state and cached inside the effect until the caller asks for a
//! rebuild, so editor panels can poll it cheaply.
//!
//! The element tree and printer are local to this module: nothing else in the
//! engine produces XML, and the document shape (a `Material` root with
//! `Techniques` and `Variables` sections) is fixed by the export contract.

use super::Effect;

/// One element of the export document tree
#[derive(Debug, Clone, Default)]
struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<XmlElement>,
}

impl XmlElement {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    fn text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.text = if text.is_empty() { None } else { Some(text) };
        self
    }

    fn child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    fn to_xml_string(&self) -> String {
        let mut out = String::new();
        self.write(&mut out, 0);
        out
    }

    fn write(&self, out: &mut String, depth: usize) {
        let indent = "    ".repeat(depth);

        out.push_str(&indent);
        out.push('<');
        out.push_str(&self.name);
        for (name, value) in &self.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape(value));
            out.push('"');
        }

        if self.children.is_empty() {
            match &self.text {
                Some(text) => {
                    out.push('>');
                    out.push_str(&escape(text));
                    out.push_str("</");
                    out.push_str(&self.name);
                    out.push_str(">\n");
                }
                None => out.push_str("/>\n"),
            }
        } else {
            out.push_str(">\n");
            for child in &self.children {
                child.write(out, depth + 1);
            }
            out.push_str(&indent);
            out.push_str("</");
            out.push_str(&self.name);
            out.push_str(">\n");
        }
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

impl Effect {
    /// Export the effect's structure and current variable values as XML
    ///
    /// The document is cached: repeated calls return identical text until
    /// `reload` is passed, which rebuilds it from the current state. Variable
    /// values written through the checked setters only become visible in the
    /// export after such a rebuild.
    pub fn export_xml(&self, reload: bool) -> String {
        let mut cache = self.xml_cache.lock().unwrap();
        if cache.is_none() || reload {
            *cache = Some(self.build_export_document());
        }
        cache.as_ref().unwrap().clone()
    }

    fn build_export_document(&self) -> String {
        let mut root = XmlElement::new("Material")
            .attribute("effect", self.name())
            .attribute("object", self.source_path());

        let mut techniques = XmlElement::new("Techniques");
        for (index, technique) in self.techniques().iter().enumerate() {
            let mut element = XmlElement::new("Technique")
                .attribute("name", technique.name())
                .attribute("checked", if index == 0 { "true" } else { "false" });

            for pass in technique.passes() {
                element = element.child(XmlElement::new("Pass").text(pass.name()));
            }

            techniques = techniques.child(element);
        }
        root = root.child(techniques);

        let mut variables = XmlElement::new("Variables");
        for variable in self.variables() {
            let mut element = XmlElement::new(variable.name());
            for annotation in variable.annotations() {
                element = element.attribute(annotation.name(), annotation.value());
            }
            variables = variables.child(element.text(variable.value_string()));
        }
        root = root.child(variables);

        root.to_xml_string()
    }
}
