use stdext::function_name;

use crate::compiler::{
    ast::{Datatype, Expression, Operator, Scalar, Statement, StatementKind, Token},
    config::GeneratorConfig,
    semantics::symbol_table::{BlockType, ScopeId, ScopeTree},
    AtLine,
};

use super::{
    error::CodegenError,
    expression::{write, ExpressionGenerator},
    types::{self, Code},
    CodegenResult,
};

macro_rules! trace {
    ($stmt:expr) => {
        log::trace!("{} <- L{}: {}", function_name!(), $stmt.line, $stmt.text)
    };
}

/// One level of indentation in the generated code.
pub const QUANTUM: &str = "  ";

/// Builtins which may be the target of a `CALL`.  They are passed straight
/// through to the runtime library.
const CALLABLE_BUILTINS: [&str; 7] = [
    "LINK",
    "COMPACTIFY",
    "RECORD_LINK",
    "TRACE",
    "UNTRACE",
    "EXIT",
    "MONITOR",
];

/// Counters which number generated names across the whole program rather
/// than within one function.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Counters {
    pub for_loops: u32,
    pub inlines: u32,
}

/**
Tracks the statements of a `DO CASE` block, each of which is one case of the
generated `switch`.  An `IF` together with the statement it controls, and an
`ELSE` together with its own statement, are parts of the same case, so the
number of statements still owed to an open `IF` or `ELSE` is kept in
`pending`.
 */
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CaseState {
    index: u32,
    pending: u32,
}

impl CaseState {
    /// Accounts for the next statement of the block.  Returns the number of
    /// the case that the statement begins, if it begins one.
    pub fn advance(&mut self, kind: &StatementKind) -> Option<u32> {
        let opens = matches!(kind, StatementKind::If(_) | StatementKind::Else);
        if *kind == StatementKind::Else {
            self.pending += 1;
        }

        let case = if self.pending == 0 {
            self.index += 1;
            Some(self.index - 1)
        } else {
            self.pending -= 1;
            None
        };

        if opens {
            self.pending += 1;
        }
        case
    }
}

/**
Generates the body of one C function: the statements of the root scope or of
a PROCEDURE's scope, along with every `DO ... END` block nested within it.
Nested PROCEDUREs are not part of the body; each becomes a function of its
own.
 */
pub struct FunctionEmitter<'a> {
    tree: &'a ScopeTree,
    config: &'a GeneratorConfig,
    counters: &'a mut Counters,
    out: String,
}

impl<'a> FunctionEmitter<'a> {
    pub fn new(
        tree: &'a ScopeTree,
        config: &'a GeneratorConfig,
        counters: &'a mut Counters,
    ) -> FunctionEmitter<'a> {
        FunctionEmitter {
            tree,
            config,
            counters,
            out: String::new(),
        }
    }

    /// Returns the code generated so far.
    pub fn finish(self) -> String {
        self.out
    }

    fn line(&mut self, indent: &str, text: &str) {
        self.out.push_str(indent);
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn expressions(&self, scope: ScopeId) -> ExpressionGenerator<'a> {
        ExpressionGenerator::new(self.tree, scope, self.config)
    }

    /**
    Emits the statements of the function whose scope is `scope` at the
    indentation of a function body.  A PROCEDURE which does not end with a
    `RETURN` gets an implicit one, so that every path through the function
    returns a value of its type.
     */
    pub fn emit_function(&mut self, scope: ScopeId) -> CodegenResult<()> {
        self.emit_statements(scope, QUANTUM, None)?;

        if let Some(proc) = self.tree.procedure_of(scope) {
            let returned = matches!(
                self.tree.get(scope).code().last().map(|s| &s.kind),
                Some(StatementKind::Return(_))
            );
            if !returned {
                let placeholder = placeholder(proc.return_type());
                self.line(QUANTUM, &format!("return {};", placeholder));
            }
        }
        Ok(())
    }

    fn emit_statements(
        &mut self,
        scope: ScopeId,
        indent: &str,
        mut case: Option<CaseState>,
    ) -> CodegenResult<()> {
        let tree = self.tree;
        let code = tree.get(scope).code();
        for (idx, stmt) in code.iter().enumerate() {
            trace!(stmt);
            let comment = self.comment(stmt);
            if let Some(n) = case.as_mut().and_then(|state| state.advance(&stmt.kind)) {
                if n > 0 {
                    self.line(indent, "break;");
                }
                let outer = &indent[..indent.len() - QUANTUM.len()];
                self.line(outer, &format!("case {}:", n));
            }
            if let Some(comment) = &comment {
                self.line(indent, comment);
            }

            let is_last = idx + 1 == code.len();
            self.emit_statement(scope, indent, stmt, is_last)?;
        }

        if case.is_some() {
            self.line(indent, "break;");
        }
        Ok(())
    }

    /// The source text of `stmt` as a comment, in verbose mode.
    fn comment(&self, stmt: &Statement) -> Option<String> {
        if !self.config.verbose || is_inline(&stmt.kind) {
            return None;
        }
        let text = stmt.text.split_whitespace().collect::<Vec<_>>().join(" ");
        Some(format!("// {} ({})", text, stmt.line))
    }

    fn emit_statement(
        &mut self,
        scope: ScopeId,
        indent: &str,
        stmt: &Statement,
        is_last: bool,
    ) -> CodegenResult<()> {
        let gen = self.expressions(scope);
        let (line, text) = (stmt.line, stmt.text.as_str());
        let inner = format!("{}{}", indent, QUANTUM);
        match &stmt.kind {
            StatementKind::Assign { lhs, rhs } => {
                self.assign(scope, indent, lhs, rhs).at(line, text)?
            }
            StatementKind::For {
                index,
                from,
                to,
                by,
                block,
            } => {
                self.for_loop(scope, indent, index, [from, to, by])
                    .at(line, text)?;
                self.emit_loop_body(*block, &format!("{}{}", inner, QUANTUM))?;
                self.line(&inner, "}");
                self.line(indent, "} // End of DO FOR block");
            }
            StatementKind::While { cond, block } => {
                let cond = gen.generate_as(cond, Datatype::Fixed).at(line, text)?;
                self.line(indent, &format!("while (1 & ({})) {{", cond.text));
                self.emit_loop_body(*block, &inner)?;
                self.line(indent, "} // End of DO WHILE block");
            }
            StatementKind::Until { cond, block } => {
                let cond = gen.generate_as(cond, Datatype::Fixed).at(line, text)?;
                self.line(indent, "do {");
                self.emit_loop_body(*block, &inner)?;
                self.line(
                    indent,
                    &format!("}} while (!(1 & ({}))); // End of DO UNTIL block", cond.text),
                );
            }
            StatementKind::Block(block) => {
                self.line(indent, &format!("{{ r{}: ;", block));
                self.emit_statements(*block, &inner, None)?;
                self.line(&inner, &format!("e{}: ;", block));
                self.line(indent, "} // End of DO block");
            }
            StatementKind::Case { selector, block } => {
                let selector = gen.generate_as(selector, Datatype::Fixed).at(line, text)?;
                self.line(
                    indent,
                    &format!("{{ r{}: switch ({}) {{", block, selector.text),
                );
                self.emit_statements(*block, &inner, Some(CaseState::default()))?;
                if self.tree.get(*block).label().is_some() {
                    self.line(indent, &format!("}} e{}: ; }} // End of DO CASE block", block));
                } else {
                    self.line(indent, "}} // End of DO CASE block");
                }
            }
            StatementKind::If(cond) => {
                let cond = gen.generate_as(cond, Datatype::Fixed).at(line, text)?;
                self.line(indent, &format!("if (1 & ({}))", cond.text));
            }
            StatementKind::Else => self.line(indent, "else"),
            StatementKind::Call { name, args } => {
                self.call(scope, indent, stmt, name, args).at(line, text)?
            }
            StatementKind::Return(value) => {
                self.ret(scope, indent, value.as_ref()).at(line, text)?
            }
            StatementKind::Goto(label) => self.line(indent, &format!("goto {};", label)),
            StatementKind::Target(label) => {
                let end = if is_last { ";" } else { "" };
                self.line(indent, &format!("{}:{}", label, end));
            }
            StatementKind::Escape(label) => {
                let jump = self.escape(scope, label.as_deref(), true).at(line, text)?;
                self.line(indent, &jump);
            }
            StatementKind::Repeat(label) => {
                let jump = self.escape(scope, label.as_deref(), false).at(line, text)?;
                self.line(indent, &jump);
            }
            StatementKind::Empty => self.line(indent, ";"),
        }
        Ok(())
    }

    /// The body of a loop.  A labeled loop gets the restart and exit labels
    /// that a labeled `REPEAT` or `ESCAPE` jumps to.
    fn emit_loop_body(&mut self, block: ScopeId, indent: &str) -> CodegenResult<()> {
        self.emit_statements(block, indent, None)?;
        if let Some(label) = self.tree.get(block).label() {
            let label = label.to_string();
            self.line(
                indent,
                &format!(
                    "if (0) {{ r{0}: continue; e{0}: break; }} // block labeled {1}",
                    block, label
                ),
            );
        }
        Ok(())
    }

    /**
    The head of `DO var = from TO to BY by`.  The three limits are evaluated
    once, before the loop starts, into variables numbered uniquely across the
    program.  The loop runs while the counter is no greater than `to`, and
    the counter keeps the value which failed the test once the loop ends.
     */
    fn for_loop(
        &mut self,
        scope: ScopeId,
        indent: &str,
        index: &Expression,
        limits: [&Expression; 3],
    ) -> Result<(), CodegenError> {
        let gen = self.expressions(scope);
        let name = index
            .get_identifier()
            .ok_or_else(|| CodegenError::LoopCounter(index.to_string()))?;
        if !index.children.is_empty() {
            return Err(CodegenError::SubscriptedLoopCounter(name.into()));
        }
        let var = gen.lookup(name)?;
        let counter = match var.scalar() {
            Some(s @ Scalar::Fixed) | Some(s @ Scalar::Bit(_)) => s,
            _ => return Err(CodegenError::LoopCounter(name.into())),
        };
        let address = var
            .address
            .ok_or_else(|| CodegenError::NotAllocated(name.into()))?;

        let n = self.counters.for_loops;
        self.counters.for_loops += 1;
        let (from, to, by) = (format!("from{}", n), format!("to{}", n), format!("by{}", n));

        let indent2 = format!("{}{}", indent, QUANTUM);
        self.line(indent, "{");
        self.line(&indent2, &format!("int32_t {}, {}, {};", from, to, by));
        for (name, limit) in [&from, &to, &by].iter().zip(limits.iter()) {
            let value = gen.generate_as(limit, Datatype::Fixed)?;
            self.line(&indent2, &format!("{} = {};", name, value.text));
        }

        let more = format!("\n{}     ", indent2);
        let header = match counter {
            Scalar::Bit(w) => format!(
                "for (putBIT({w}, {a}, fixedToBit({w}, {from}));{more}\
                 bitToFixed(getBIT({w}, {a})) <= {to};{more}\
                 putBIT({w}, {a}, fixedToBit({w}, bitToFixed(getBIT({w}, {a})) + {by}))) {{",
                w = w,
                a = address,
                from = from,
                to = to,
                by = by,
                more = more
            ),
            _ => format!(
                "for (putFIXED({a}, {from});{more}\
                 getFIXED({a}) <= {to};{more}\
                 putFIXED({a}, getFIXED({a}) + {by})) {{",
                a = address,
                from = from,
                to = to,
                by = by,
                more = more
            ),
        };
        self.line(&indent2, &header);
        Ok(())
    }

    /**
    An assignment to one or more targets.  The right hand side is evaluated
    once, into a temporary of its own type, and converted to each type that
    the targets need the first time that type is needed.  `FILE` on either
    side moves whole records between a file and memory instead.
     */
    fn assign(
        &mut self,
        scope: ScopeId,
        indent: &str,
        lhs: &[Expression],
        rhs: &Expression,
    ) -> Result<(), CodegenError> {
        let gen = self.expressions(scope);
        let inner = format!("{}{}", indent, QUANTUM);
        self.line(indent, "{");

        if rhs.is_builtin("FILE") {
            let (dev_r, rec_r) = gen.file_parameters(rhs)?;
            for target in lhs {
                if target.is_builtin("FILE") {
                    let (dev_l, rec_l) = gen.file_parameters(target)?;
                    self.line(
                        &inner,
                        &format!("bFILE({}, {}, {}, {});", dev_l, rec_l, dev_r, rec_r),
                    );
                } else {
                    let addr = gen.element_addr(target)?;
                    self.line(&inner, &format!("rFILE({}, {}, {});", addr, dev_r, rec_r));
                }
            }
            self.line(indent, "}");
            return Ok(());
        }

        let mut value = if lhs.iter().any(|l| !l.is_builtin("FILE")) {
            let rhs = gen.generate(rhs)?;
            Some(Temporaries::new(rhs, &inner, &mut self.out))
        } else {
            None
        };

        for target in lhs {
            match &mut value {
                Some(value) if !target.is_builtin("FILE") => {
                    let store = self.store(&gen, target, value)?;
                    self.line(&inner, &store);
                }
                _ => {
                    let (dev, rec) = gen.file_parameters(target)?;
                    let addr = gen.element_addr(rhs)?;
                    self.line(&inner, &format!("lFILE({}, {}, {});", dev, rec, addr));
                }
            }
        }
        self.line(indent, "}");
        Ok(())
    }

    /// The store of the assigned value into one target.
    fn store(
        &mut self,
        gen: &ExpressionGenerator,
        target: &Expression,
        value: &mut Temporaries,
    ) -> Result<String, CodegenError> {
        match &target.token {
            Token::Operator(Operator::Field) => {
                let (ty, address) = gen.field_address(target)?;
                let temp = value.get(ty.datatype(), &mut self.out)?;
                Ok(format!("{};", write(ty, &address, temp)))
            }
            Token::Identifier(name) => {
                let var = gen.lookup(name)?;
                let ty = var
                    .element()
                    .ok_or_else(|| CodegenError::UnsupportedTarget(name.clone()))?;
                let base = gen.base_address(var)?;
                let address = match gen.subscript(name, &target.children)? {
                    Some(i) => format!("{} + {}*({})", base, var.stride(), i),
                    None => base,
                };
                let temp = value.get(ty.datatype(), &mut self.out)?;
                Ok(format!("{};", write(ty, &address, temp)))
            }
            Token::Builtin(name) => self.store_builtin(gen, name, target, value),
            _ => Err(CodegenError::UnsupportedTarget(target.to_string())),
        }
    }

    /// Pseudo-variables of the runtime library which can be assigned to.
    fn store_builtin(
        &mut self,
        gen: &ExpressionGenerator,
        name: &str,
        target: &Expression,
        value: &mut Temporaries,
    ) -> Result<String, CodegenError> {
        let args = &target.children;
        match name {
            "FREEPOINT" | "FREELIMIT" => {
                let temp = value.get(Datatype::Fixed, &mut self.out)?;
                Ok(format!("{}2({});", name, temp))
            }
            "COREBYTE" | "COREWORD" | "COREHALFWORD" => match args.as_slice() {
                [address] => {
                    let address = gen.generate_as(address, Datatype::Fixed)?;
                    let temp = value.get(Datatype::Fixed, &mut self.out)?;
                    Ok(format!("{}2({}, {});", name, address.text, temp))
                }
                _ => Err(CodegenError::BuiltinArguments(name.into())),
            },
            "OUTPUT" => {
                let device = match args.as_slice() {
                    [] => "0".to_string(),
                    [device] => gen.generate_as(device, Datatype::Fixed)?.text,
                    _ => return Err(CodegenError::BuiltinArguments(name.into())),
                };
                let temp = value.get(Datatype::Character, &mut self.out)?;
                Ok(format!("OUTPUT({}, {});", device, temp))
            }
            "BYTE" => {
                let (string, index) = match args.as_slice() {
                    [string] => (string, "0".to_string()),
                    [string, index] => (string, gen.generate_as(index, Datatype::Fixed)?.text),
                    _ => return Err(CodegenError::BuiltinArguments(name.into())),
                };
                let address = gen.element_addr(string)?;
                let (temp, is_bit) = if value.ty() == Datatype::Character {
                    (value.get(Datatype::Character, &mut self.out)?, 0)
                } else {
                    (value.get(Datatype::Fixed, &mut self.out)?, 1)
                };
                Ok(format!("lBYTE({}, {}, {}, {});", address, index, temp, is_bit))
            }
            _ => Err(CodegenError::UnsupportedTarget(target.to_string())),
        }
    }

    fn call(
        &mut self,
        scope: ScopeId,
        indent: &str,
        stmt: &Statement,
        name: &str,
        args: &[Expression],
    ) -> Result<(), CodegenError> {
        let gen = self.expressions(scope);
        if name == "INLINE" {
            self.inline(indent, stmt, args);
            return Ok(());
        }

        if CALLABLE_BUILTINS.contains(&name) {
            let args = args
                .iter()
                .map(|a| gen.generate(a).map(|c| c.text))
                .collect::<Result<Vec<_>, _>>()?;
            self.line(indent, &format!("{}({});", name, args.join(", ")));
            return Ok(());
        }

        let var = gen
            .lookup(name)
            .map_err(|_| CodegenError::ProcedureNotFound(name.into()))?;
        let proc = var
            .get_procedure()
            .ok_or_else(|| CodegenError::NotAProcedure(name.into()))?;
        let call = gen.call(var, proc, args)?;
        if call.stores.is_empty() {
            self.line(indent, &format!("{}();", call.function));
        } else {
            let inner = format!("{}{}", indent, QUANTUM);
            self.line(indent, "{");
            for store in &call.stores {
                self.line(&inner, &format!("{};", store));
            }
            self.line(&inner, &format!("{}();", call.function));
            self.line(indent, "}");
        }
        Ok(())
    }

    /**
    `CALL INLINE(...)` embeds machine code, which cannot be translated.  A
    string argument is taken to be C already and is copied through.
    Otherwise the statement is replaced by the contents of the file
    `patchN.c` from the patch directory, where `N` numbers the `CALL
    INLINE`s of the program in order, or by a comment when there is no such
    file.
     */
    fn inline(&mut self, indent: &str, stmt: &Statement, args: &[Expression]) {
        if let Some(Token::String(code)) = args.first().map(|a| &a.token) {
            self.line(indent, code);
            return;
        }

        let n = self.counters.inlines;
        self.counters.inlines += 1;
        let text = stmt.text.trim();
        let patch = self
            .config
            .patch_dir
            .as_ref()
            .map(|dir| dir.join(format!("patch{}.c", n)))
            .and_then(|path| std::fs::read_to_string(path).ok());
        match patch {
            Some(patch) => {
                let inner = format!("{}{}", indent, QUANTUM);
                self.line(indent, &format!("{{ // ({}) {}", n, text));
                for line in patch.lines() {
                    self.line(&inner, line.trim_end());
                }
                self.line(indent, "}");
            }
            None => {
                log::debug!("No patch{}.c for CALL INLINE at line {}", n, stmt.line);
                self.line(indent, &format!("; // ({}) {}", n, text));
            }
        }
    }

    /// `RETURN`, which at the top level ends the program instead.
    fn ret(
        &mut self,
        scope: ScopeId,
        indent: &str,
        value: Option<&Expression>,
    ) -> Result<(), CodegenError> {
        let gen = self.expressions(scope);
        let proc = match self.tree.enclosing_procedure(scope) {
            None => {
                let code = match value {
                    Some(v) => gen.generate_as(v, Datatype::Fixed)?.text,
                    None => "0".into(),
                };
                self.line(indent, &format!("exit({});", code));
                return Ok(());
            }
            Some(proc) => proc,
        };

        let returns = self
            .tree
            .procedure_of(proc)
            .ok_or_else(|| CodegenError::ProcedureNotFound(self.tree.get(proc).symbol().into()))?
            .return_type();
        let code = match value {
            Some(v) => gen.generate_as(v, returns.datatype())?.text,
            None => placeholder(returns).into(),
        };
        self.line(indent, &format!("return {};", code));
        Ok(())
    }

    /**
    The jump for `ESCAPE` (when `escape` is true) or `REPEAT`.  Without a
    label these leave or restart the innermost block; a label selects an
    enclosing block of the same PROCEDURE.
     */
    fn escape(&self, scope: ScopeId, label: Option<&str>, escape: bool) -> Result<String, CodegenError> {
        let statement = if escape { "ESCAPE" } else { "REPEAT" };
        let marker = if escape { 'e' } else { 'r' };

        let label = match label {
            Some(label) => label,
            None => {
                return match (self.tree.get(scope).block(), escape) {
                    (BlockType::DoBlock, _) | (BlockType::DoCase, false) => {
                        Ok(format!("goto {}{};", marker, scope))
                    }
                    (BlockType::DoCase, true) => Ok("break;".into()),
                    (b, true) if b.is_loop() => Ok("break;".into()),
                    (b, false) if b.is_loop() => Ok("continue;".into()),
                    _ => Err(CodegenError::NoEnclosingBlock(statement)),
                }
            }
        };

        let mut current = scope;
        loop {
            let s = self.tree.get(current);
            match s.block() {
                BlockType::Root | BlockType::Procedure => break,
                _ if s.label() == Some(label) => {
                    return Ok(format!("goto {}{};", marker, current))
                }
                _ => match s.parent() {
                    Some(parent) => current = parent,
                    None => break,
                },
            }
        }
        Err(CodegenError::LabelNotFound(label.into()))
    }
}

fn is_inline(kind: &StatementKind) -> bool {
    matches!(kind, StatementKind::Call { name, .. } if name == "INLINE")
}

/// The value returned by a PROCEDURE which ends without a `RETURN` value.
pub fn placeholder(ty: Scalar) -> &'static str {
    match ty {
        Scalar::Fixed => "0",
        Scalar::Character => "\"\"",
        Scalar::Bit(_) => "fixedToBit(32, 0)",
    }
}

/**
The value of an assignment's right hand side, held in temporaries named for
their type.  A temporary of any other type is declared and filled from the
original the first time it is asked for.
 */
struct Temporaries {
    source: Code,
    indent: String,
    defined: Vec<Datatype>,
}

impl Temporaries {
    fn new(rhs: Code, indent: &str, out: &mut String) -> Temporaries {
        let name = temporary(rhs.ty);
        let declaration = match rhs.ty {
            Datatype::Fixed => format!("int32_t {} = (int32_t) ({});", name, rhs.text),
            Datatype::Bit => format!("bit_t *{} = {};", name, rhs.text),
            Datatype::Character => format!("string_t {0};\n{1}strcpy({0}, {2});", name, indent, rhs.text),
        };
        out.push_str(indent);
        out.push_str(&declaration);
        out.push('\n');

        let ty = rhs.ty;
        Temporaries {
            source: Code {
                text: name.into(),
                ..rhs
            },
            indent: indent.into(),
            defined: vec![ty],
        }
    }

    fn ty(&self) -> Datatype {
        self.source.ty
    }

    /// The name of the temporary holding the value as a `ty`.
    fn get(&mut self, ty: Datatype, out: &mut String) -> Result<&'static str, CodegenError> {
        let name = temporary(ty);
        if self.defined.contains(&ty) {
            return Ok(name);
        }

        let converted = types::convert(self.source.clone(), &[ty])?;
        let declaration = match ty {
            Datatype::Fixed => format!("int32_t {} = {};", name, converted.text),
            Datatype::Bit => format!("bit_t *{} = {};", name, converted.text),
            Datatype::Character => format!(
                "string_t {0};\n{1}strcpy({0}, {2});",
                name, self.indent, converted.text
            ),
        };
        out.push_str(&self.indent);
        out.push_str(&declaration);
        out.push('\n');
        self.defined.push(ty);
        Ok(name)
    }
}

fn temporary(ty: Datatype) -> &'static str {
    match ty {
        Datatype::Fixed => "numberRHS",
        Datatype::Bit => "bitRHS",
        Datatype::Character => "stringRHS",
    }
}
