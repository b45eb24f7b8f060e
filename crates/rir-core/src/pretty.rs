use std::fmt::{self, Formatter};

use crate::body::{Body, Program};

/// Configuration for pretty-printing bodies.
#[derive(Debug, Clone)]
pub struct PrettyOptions {
    /// Number of spaces to indent per nesting level.
    pub indent_size: usize,
    /// Print the label arena ahead of the blocks.
    pub show_labels: bool,
}

impl Default for PrettyOptions {
    fn default() -> Self {
        Self {
            indent_size: 4,
            show_labels: false,
        }
    }
}

/// Formatting context shared across pretty printers.
pub struct PrettyCtx<'a> {
    pub options: &'a PrettyOptions,
    indent: usize,
}

impl<'a> PrettyCtx<'a> {
    pub fn new(options: &'a PrettyOptions) -> Self {
        Self { options, indent: 0 }
    }

    pub fn write_indent(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for _ in 0..self.indent {
            write!(f, " ")?;
        }
        Ok(())
    }

    pub fn writeln(&self, f: &mut Formatter<'_>, line: impl AsRef<str>) -> fmt::Result {
        self.write_indent(f)?;
        writeln!(f, "{}", line.as_ref())
    }

    pub fn with_indent<F>(&mut self, mut f_closure: F) -> fmt::Result
    where
        F: FnMut(&mut Self) -> fmt::Result,
    {
        self.indent += self.options.indent_size;
        let result = f_closure(self);
        self.indent = self.indent.saturating_sub(self.options.indent_size);
        result
    }
}

/// Trait implemented by IR nodes that support pretty-printing.
pub trait PrettyPrintable {
    fn fmt_pretty(&self, f: &mut Formatter<'_>, ctx: &mut PrettyCtx<'_>) -> fmt::Result;
}

/// Helper wrapper implementing `Display` by delegating to `PrettyPrintable`.
pub struct PrettyDisplay<'a, T> {
    value: &'a T,
    options: PrettyOptions,
}

impl<'a, T> fmt::Display for PrettyDisplay<'a, T>
where
    T: PrettyPrintable,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut ctx = PrettyCtx::new(&self.options);
        self.value.fmt_pretty(f, &mut ctx)
    }
}

/// Convenience helper to build a `PrettyDisplay` wrapper.
pub fn pretty<T>(value: &T, options: PrettyOptions) -> PrettyDisplay<'_, T>
where
    T: PrettyPrintable,
{
    PrettyDisplay { value, options }
}

impl PrettyPrintable for Body {
    fn fmt_pretty(&self, f: &mut Formatter<'_>, ctx: &mut PrettyCtx<'_>) -> fmt::Result {
        ctx.writeln(f, format!("def {}(args: {}) {{", self.name, self.arg_count))?;
        ctx.with_indent(|ctx| {
            if ctx.options.show_labels && !self.labels().is_empty() {
                ctx.writeln(f, "labels:")?;
                ctx.with_indent(|ctx| {
                    for decl in self.labels() {
                        ctx.writeln(f, format!("{} = {:?}", decl.id, decl.name))?;
                    }
                    Ok(())
                })?;
            }
            for block in &self.basic_blocks {
                ctx.writeln(f, format!("{}:", block.label))?;
                ctx.with_indent(|ctx| {
                    for instr in &block.instrs {
                        ctx.writeln(f, instr.to_string())?;
                    }
                    Ok(())
                })?;
            }
            Ok(())
        })?;
        ctx.writeln(f, "}")
    }
}

impl PrettyPrintable for Program {
    fn fmt_pretty(&self, f: &mut Formatter<'_>, ctx: &mut PrettyCtx<'_>) -> fmt::Result {
        if let Some(entry) = &self.entry {
            ctx.writeln(f, format!("# entry: {}", entry))?;
        }
        for (idx, body) in self.bodies.iter().enumerate() {
            body.fmt_pretty(f, ctx)?;
            if idx + 1 < self.bodies.len() {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
