/// Represents all errors that are generated from within the Compiler
/// module and its submodules.
///
/// This type captures common metadata which is necessarily present for
/// all errors which are caused by the input program.  E.g. the line #
/// and the source text of the statement that the error occurs on. This
/// also handles formatting all error messages with the universal metadata
/// along with the inner metadata.
///
/// The inner error allows metadata which is specific to a submodule within
/// the compiler. E.g., the errors themselves are pass specific and
/// are stored in the `inner` field.
#[derive(Clone, Debug, PartialEq)]
pub struct CompilerError<IE: CompilerErrorDisplay> {
    line: u32,
    text: String,
    inner: IE,
}

impl<IE> CompilerError<IE>
where
    IE: CompilerErrorDisplay,
{
    pub fn new(line: u32, inner: IE) -> Self {
        CompilerError {
            line,
            text: String::new(),
            inner,
        }
    }

    /// Attaches the source text of the offending statement.
    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.trim().into();
        self
    }

    pub fn inner(self) -> IE {
        self.inner
    }

    pub fn get_inner(&self) -> &IE {
        &self.inner
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl<IE> CompilerErrorDisplay for CompilerError<IE>
where
    IE: CompilerErrorDisplay,
{
    fn format(&self) -> String {
        let inner = self.inner.format();
        if self.text.is_empty() {
            format!("L{}: {}", self.line, inner)
        } else {
            format!("L{}: {}\n{}", self.line, self.text, inner)
        }
    }
}

impl<IE> std::fmt::Display for CompilerError<IE>
where
    IE: CompilerErrorDisplay,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format())
    }
}

pub trait CompilerErrorDisplay {
    fn format(&self) -> String;
}

/// Converts a pass specific error into a [`CompilerError`] located at
/// the given source line.
pub trait AtLine<T, IE: CompilerErrorDisplay> {
    fn at(self, line: u32, text: &str) -> Result<T, CompilerError<IE>>;
}

impl<T, IE> AtLine<T, IE> for Result<T, IE>
where
    IE: CompilerErrorDisplay,
{
    fn at(self, line: u32, text: &str) -> Result<T, CompilerError<IE>> {
        self.map_err(|e| CompilerError::new(line, e).with_text(text))
    }
}
