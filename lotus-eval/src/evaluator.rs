//! The tree-walking evaluator: statements in, side effects (and GC
//! allocations) out.

use std::io::Write;

use lotus_gc::{Closure, Gc, Value, ValueId};
use lotus_par::{Expr, LiteralKind, Operator, Stmt};

use crate::environment::Environment;
use crate::error::{Result, RuntimeError};

/// Bound on the evaluator's own recursive-descent call depth. The source's
/// 100,000-frame budget assumes a purpose-built return-frame stack; here
/// every Lotus call recurses through several native Rust stack frames
/// (`invoke` -> `exec_stmt` -> `exec_block` -> ...), so the bound is scaled
/// down to stay well inside a default 8 MiB thread stack.
const MAX_CALL_DEPTH: usize = 2_000;

/// The outcome of evaluating a statement: either its produced value (every
/// statement yields one, per the uniform reading of §9's "block return
/// value" open question), or a `return` unwinding toward its call frame.
#[derive(Debug, Clone, Copy)]
enum Flow {
    Normal(ValueId),
    Returning(ValueId),
}

impl Flow {
    fn value(self) -> ValueId {
        match self {
            Flow::Normal(v) | Flow::Returning(v) => v,
        }
    }
}

/// Executes a parsed program against a fresh heap and environment, writing
/// `print` output to `out`.
pub struct Evaluator<W: Write> {
    gc: Gc,
    env: Environment,
    call_depth: usize,
    out: W,
}

impl<W: Write> Evaluator<W> {
    pub fn new(out: W) -> Self {
        Evaluator { gc: Gc::new(), env: Environment::new(), call_depth: 0, out }
    }

    /// Runs every top-level statement in order. Stops at the first runtime
    /// error — the caller is expected to treat that as fatal (§7).
    pub fn run(&mut self, program: &[Stmt]) -> Result<()> {
        for stmt in program {
            self.exec_stmt(stmt)?;
        }
        Ok(())
    }

    pub fn live_value_count(&self) -> usize {
        self.gc.live_count()
    }

    // ---- statement execution -------------------------------------------

    /// Runs a GC pass rooted at the current environment plus the hold
    /// stack. The trigger policy only requires this be safe to call between
    /// statements, not that it run after every one — calling it after every
    /// statement (including nested ones) is the strongest exercise of the
    /// hold-stack discipline, so that's what this evaluator does.
    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow> {
        let flow = self.exec_stmt_kind(stmt)?;
        self.gc.hold(flow.value());
        self.collect();
        self.gc.release(1);
        Ok(flow)
    }

    fn collect(&mut self) {
        let roots: Vec<ValueId> = self.env.roots().collect();
        self.gc.collect(roots);
    }

    fn exec_stmt_kind(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expr { expr, line } => {
                let v = self.eval_expr(expr, *line)?;
                Ok(Flow::Normal(v))
            }
            Stmt::Print { expr, line } => {
                let v = self.eval_expr(expr, *line)?;
                let text = self.format_value(v)?;
                writeln!(self.out, "{text}")?;
                self.out.flush()?;
                Ok(Flow::Normal(v))
            }
            Stmt::Declaration { name, expr, line } => {
                let v = self.eval_expr(expr, *line)?;
                self.env.bind(name.clone(), v);
                Ok(Flow::Normal(v))
            }
            Stmt::Assignment { name, expr, line } => {
                let v = self.eval_expr(expr, *line)?;
                if self.env.set(name, v).is_none() {
                    return Err(RuntimeError::UndeclaredIdentifier { name: name.clone(), line: *line });
                }
                Ok(Flow::Normal(v))
            }
            Stmt::If { cond, then_branch, else_branch, line } => {
                let c = self.eval_expr(cond, *line)?;
                let taken = self.expect_boolean(c, *line)?;
                if taken {
                    self.exec_stmt(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.exec_stmt(else_branch)
                } else {
                    Ok(Flow::Normal(self.gc.alloc(Value::Nil)))
                }
            }
            Stmt::Block { stmts, .. } => self.exec_block(stmts),
            Stmt::Function { name, formals, body, .. } => {
                let closure =
                    Closure { name: name.clone(), formals: formals.clone(), body: (**body).clone() };
                let id = self.gc.alloc(Value::Closure(closure));
                self.env.bind(name.clone(), id);
                Ok(Flow::Normal(self.gc.alloc(Value::Nil)))
            }
            Stmt::Return { expr, line } => {
                if self.call_depth == 0 {
                    return Err(RuntimeError::ReturnOutsideFunction { line: *line });
                }
                let v = self.eval_expr(expr, *line)?;
                Ok(Flow::Returning(v))
            }
        }
    }

    fn exec_block(&mut self, stmts: &[Stmt]) -> Result<Flow> {
        let env_mark = self.env.len();
        let hold_mark = self.gc.hold_depth();

        let mut flow = Flow::Normal(self.gc.alloc(Value::Nil));
        for stmt in stmts {
            flow = self.exec_stmt(stmt)?;
            self.gc.hold(flow.value());
            if matches!(flow, Flow::Returning(_)) {
                break;
            }
        }

        self.gc.mark(flow.value());
        self.gc.release(self.gc.hold_depth().saturating_sub(hold_mark));
        self.env.restore(env_mark);
        Ok(flow)
    }

    // ---- expression evaluation ------------------------------------------

    fn eval_expr(&mut self, expr: &Expr, line: u32) -> Result<ValueId> {
        match expr {
            Expr::Literal { kind, payload } => self.eval_literal(*kind, payload, line),
            Expr::Identifier { name } => self
                .env
                .get(name)
                .ok_or_else(|| RuntimeError::UndeclaredIdentifier { name: name.clone(), line }),
            Expr::Grouping { inner } => self.eval_expr(inner, line),
            Expr::Unary { op, right } => self.eval_unary(*op, right, line),
            Expr::Binary { left, op, right } => self.eval_binary(left, *op, right, line),
            Expr::Call { name, actuals } => self.eval_call(name, actuals, line),
            Expr::PanicSentinel => {
                unreachable!("panic-mode recovery guarantees this never reaches the evaluator")
            }
        }
    }

    fn eval_literal(&mut self, kind: LiteralKind, payload: &str, line: u32) -> Result<ValueId> {
        let value = match kind {
            LiteralKind::Number => {
                let n: f64 = payload.parse().map_err(|_| RuntimeError::TypeMismatch {
                    message: format!("invalid number literal '{payload}'"),
                    line,
                })?;
                Value::Number(n)
            }
            LiteralKind::Boolean => Value::Boolean(payload == "true"),
            LiteralKind::Nil => Value::Nil,
            LiteralKind::String => Value::String(payload.to_string()),
        };
        Ok(self.gc.alloc(value))
    }

    fn eval_unary(&mut self, op: Operator, right: &Expr, line: u32) -> Result<ValueId> {
        let r = self.eval_expr(right, line)?;
        self.gc.hold(r);
        let result = match op {
            Operator::Minus => Value::Number(-self.expect_number(r, line)?),
            Operator::Not => Value::Boolean(!self.expect_boolean(r, line)?),
            other => unreachable!("parser never attaches {other:?} to a Unary node"),
        };
        let id = self.gc.alloc(result);
        self.gc.release(1);
        Ok(id)
    }

    fn eval_binary(&mut self, left: &Expr, op: Operator, right: &Expr, line: u32) -> Result<ValueId> {
        match op {
            Operator::Forward => self.eval_forward(left, right, line),
            Operator::And | Operator::Or => self.eval_lazy_bool(left, op, right, line),
            _ => {
                let l = self.eval_expr(left, line)?;
                self.gc.hold(l);
                let r = self.eval_expr(right, line)?;
                self.gc.hold(r);
                let result = self.apply_binary(l, op, r, line)?;
                let id = self.gc.alloc(result);
                self.gc.release(2);
                Ok(id)
            }
        }
    }

    /// §4.3.3: evaluate the left operand and hold it; if it already
    /// determines the result, never evaluate the right operand at all.
    fn eval_lazy_bool(&mut self, left: &Expr, op: Operator, right: &Expr, line: u32) -> Result<ValueId> {
        let l = self.eval_expr(left, line)?;
        self.gc.hold(l);
        let lb = self.expect_boolean(l, line)?;

        let short_circuits = match op {
            Operator::And => !lb,
            Operator::Or => lb,
            _ => unreachable!("only And/Or reach eval_lazy_bool"),
        };
        if short_circuits {
            let id = self.gc.alloc(Value::Boolean(lb));
            self.gc.release(1);
            return Ok(id);
        }

        let r = self.eval_expr(right, line)?;
        self.gc.hold(r);
        let rb = self.expect_boolean(r, line)?;
        let id = self.gc.alloc(Value::Boolean(rb));
        self.gc.release(2);
        Ok(id)
    }

    /// `|>`: the right-hand side must already be a `Call`; the left value is
    /// evaluated and prepended to its actuals before the call is invoked.
    fn eval_forward(&mut self, left: &Expr, right: &Expr, line: u32) -> Result<ValueId> {
        let Expr::Call { name, actuals } = right else {
            return Err(RuntimeError::ForwardTargetNotACall { line });
        };

        let l = self.eval_expr(left, line)?;
        self.gc.hold(l);
        let mut actual_ids = vec![l];
        for actual in actuals {
            let v = self.eval_expr(actual, line)?;
            self.gc.hold(v);
            actual_ids.push(v);
        }
        self.invoke(name, &actual_ids, line)
    }

    fn eval_call(&mut self, name: &str, actuals: &[Expr], line: u32) -> Result<ValueId> {
        let mut actual_ids = Vec::with_capacity(actuals.len());
        for actual in actuals {
            let v = self.eval_expr(actual, line)?;
            self.gc.hold(v);
            actual_ids.push(v);
        }
        self.invoke(name, &actual_ids, line)
    }

    /// §4.3.1 "Call": actuals are already evaluated and held by the caller
    /// (left-to-right, one completed before the next begins — invariant 4).
    fn invoke(&mut self, name: &str, actual_ids: &[ValueId], line: u32) -> Result<ValueId> {
        let callee_id = self
            .env
            .get(name)
            .ok_or_else(|| RuntimeError::UndeclaredIdentifier { name: name.to_string(), line })?;
        let closure = match self.gc.get(callee_id)? {
            Value::Closure(c) => c.clone(),
            _ => return Err(RuntimeError::NotAFunction { name: name.to_string(), line }),
        };
        if closure.formals.len() != actual_ids.len() {
            return Err(RuntimeError::ArityMismatch {
                name: name.to_string(),
                expected: closure.formals.len(),
                got: actual_ids.len(),
                line,
            });
        }
        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::StackOverflow { line });
        }

        let snapshot = self.env.len();
        self.env.bulk_bind(&closure.formals, actual_ids);
        self.gc.release(actual_ids.len());

        self.call_depth += 1;
        let flow = self.exec_stmt(&closure.body);
        self.call_depth -= 1;
        let flow = flow?;

        self.env.restore(snapshot);
        let result = flow.value();
        self.gc.mark(result);
        Ok(result)
    }

    // ---- operators --------------------------------------------------------

    fn apply_binary(&self, l: ValueId, op: Operator, r: ValueId, line: u32) -> Result<Value> {
        match op {
            Operator::Plus => match (self.gc.get(l)?, self.gc.get(r)?) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
                _ => Err(self.arithmetic_mismatch(l, r, line)?),
            },
            Operator::Minus => Ok(Value::Number(self.expect_number(l, line)? - self.expect_number(r, line)?)),
            Operator::Star => Ok(Value::Number(self.expect_number(l, line)? * self.expect_number(r, line)?)),
            Operator::Slash => Ok(Value::Number(self.expect_number(l, line)? / self.expect_number(r, line)?)),
            Operator::Mod => Ok(Value::Number(self.expect_number(l, line)? % self.expect_number(r, line)?)),
            Operator::Less => Ok(Value::Boolean(self.expect_number(l, line)? < self.expect_number(r, line)?)),
            Operator::LessEqual => {
                Ok(Value::Boolean(self.expect_number(l, line)? <= self.expect_number(r, line)?))
            }
            Operator::Greater => {
                Ok(Value::Boolean(self.expect_number(l, line)? > self.expect_number(r, line)?))
            }
            Operator::GreaterEqual => {
                Ok(Value::Boolean(self.expect_number(l, line)? >= self.expect_number(r, line)?))
            }
            Operator::Equal => Ok(Value::Boolean(self.value_eq(l, r, line)?)),
            Operator::NotEqual => Ok(Value::Boolean(!self.value_eq(l, r, line)?)),
            Operator::And | Operator::Or | Operator::Not | Operator::Forward => {
                unreachable!("And/Or/Not/Forward never reach apply_binary")
            }
        }
    }

    fn arithmetic_mismatch(&self, l: ValueId, r: ValueId, line: u32) -> Result<RuntimeError> {
        let l_name = self.gc.get(l)?.type_name();
        let r_name = self.gc.get(r)?.type_name();
        Ok(RuntimeError::TypeMismatch {
            message: format!("'+' requires two Numbers or two Strings, got {l_name} and {r_name}"),
            line,
        })
    }

    /// `==`/`!=`: different kinds never compare equal; two Closures are a
    /// runtime error rather than a (meaningless) identity comparison.
    fn value_eq(&self, l: ValueId, r: ValueId, line: u32) -> Result<bool> {
        match (self.gc.get(l)?, self.gc.get(r)?) {
            (Value::Number(a), Value::Number(b)) => Ok(a == b),
            (Value::String(a), Value::String(b)) => Ok(a == b),
            (Value::Boolean(a), Value::Boolean(b)) => Ok(a == b),
            (Value::Nil, Value::Nil) => Ok(true),
            (Value::Closure(_), Value::Closure(_)) => Err(RuntimeError::ClosureComparison { line }),
            _ => Ok(false),
        }
    }

    fn expect_number(&self, id: ValueId, line: u32) -> Result<f64> {
        match self.gc.get(id)? {
            Value::Number(n) => Ok(*n),
            other => Err(RuntimeError::TypeMismatch {
                message: format!("expected Number, found {}", other.type_name()),
                line,
            }),
        }
    }

    fn expect_boolean(&self, id: ValueId, line: u32) -> Result<bool> {
        match self.gc.get(id)? {
            Value::Boolean(b) => Ok(*b),
            other => Err(RuntimeError::TypeMismatch {
                message: format!("expected Boolean, found {}", other.type_name()),
                line,
            }),
        }
    }

    /// §4.3.4 output formatting.
    fn format_value(&self, id: ValueId) -> Result<String> {
        Ok(match self.gc.get(id)? {
            Value::Number(n) if n.fract() == 0.0 => format!("{n:.0}"),
            Value::Number(n) => format!("{n:.2}"),
            Value::Boolean(b) => b.to_string(),
            Value::Nil => "nil".to_string(),
            Value::String(s) => s.clone(),
            Value::Closure(c) => format!("fun<{}>", c.name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lotus_lex::Scanner;
    use lotus_par::Parser;
    use lotus_util::{Handler, Level};

    fn run(src: &str) -> String {
        let handler = Handler::new(Level::Error);
        let tokens = Scanner::new(src, &handler).scan_tokens();
        let program = Parser::new(tokens, &handler).parse();
        assert_eq!(handler.error_count(), 0, "unexpected parse errors for {src:?}");
        let mut out = Vec::new();
        {
            let mut evaluator = Evaluator::new(&mut out);
            evaluator.run(&program).expect("evaluation should succeed");
        }
        String::from_utf8(out).unwrap()
    }

    fn run_err(src: &str) -> RuntimeError {
        let handler = Handler::new(Level::Error);
        let tokens = Scanner::new(src, &handler).scan_tokens();
        let program = Parser::new(tokens, &handler).parse();
        let mut out = Vec::new();
        let mut evaluator = Evaluator::new(&mut out);
        evaluator.run(&program).expect_err("expected a runtime error")
    }

    #[test]
    fn s1_arithmetic_and_integral_formatting() {
        let out = run("print 1 + 2 * 3;\nprint (1 + 2) * 3;\nprint 7 % 3;\n");
        assert_eq!(out, "7\n9\n1\n");
    }

    #[test]
    fn s2_booleans_and_short_circuit() {
        let out = run(
            "fun side() { print \"x\"; return true; }\n\
             print false and side();\n\
             print true or side();\n\
             print true and side();\n",
        );
        assert_eq!(out, "false\ntrue\nx\ntrue\n");
    }

    #[test]
    fn s3_closures_resolve_free_variables_at_call_time() {
        let out = run("let x = 1;\nfun get() { return x; }\nx = 99;\nprint get();\n");
        assert_eq!(out, "99\n");
    }

    #[test]
    fn s4_recursion_and_return() {
        let out = run("fun fact(n) { if (n <= 1) return 1; return n * fact(n - 1); }\nprint fact(5);\n");
        assert_eq!(out, "120\n");
    }

    #[test]
    fn s5_forwarding_operator() {
        let out = run(
            "fun inc(x) { return x + 1; }\nfun dbl(x) { return x * 2; }\nprint 3 |> inc() |> dbl();\n",
        );
        assert_eq!(out, "8\n");
    }

    #[test]
    fn s6_lexical_scope_and_shadowing_in_blocks() {
        let out = run("let a = 1;\n{ let a = 2; print a; }\nprint a;\n");
        assert_eq!(out, "2\n1\n");
    }

    #[test]
    fn string_concatenation_is_left_to_right() {
        let out = run("print \"a\" + \"b\" + \"c\";\n");
        assert_eq!(out, "abc\n");
    }

    #[test]
    fn undeclared_identifier_is_fatal() {
        let err = run_err("print missing;\n");
        assert!(matches!(err, RuntimeError::UndeclaredIdentifier { .. }));
    }

    #[test]
    fn comparing_closures_directly_errors() {
        let err = run_err("fun f() { return 1; }\nfun g() { return 2; }\nlet same = f == g;\n");
        assert!(matches!(err, RuntimeError::ClosureComparison { .. }));
    }

    #[test]
    fn arity_mismatch_is_fatal() {
        let err = run_err("fun f(a, b) { return a; }\nprint f(1);\n");
        assert!(matches!(err, RuntimeError::ArityMismatch { .. }));
    }

    #[test]
    fn return_outside_function_is_fatal() {
        let err = run_err("return 1;\n");
        assert!(matches!(err, RuntimeError::ReturnOutsideFunction { .. }));
    }

    #[test]
    fn calling_a_non_function_is_fatal() {
        let err = run_err("let x = 1;\nprint x();\n");
        assert!(matches!(err, RuntimeError::NotAFunction { .. }));
    }

    #[test]
    fn block_scoped_declaration_does_not_leak() {
        let err = run_err("{ let a = 1; }\nprint a;\n");
        assert!(matches!(err, RuntimeError::UndeclaredIdentifier { .. }));
    }

    #[test]
    fn nan_is_never_equal_to_itself() {
        // 0.0/0.0 scans as two numeric literals divided, not a literal NaN,
        // but IEEE division still produces one.
        let out = run("print (0 / 0 == 0 / 0);\n");
        assert_eq!(out, "false\n");
    }

    proptest::proptest! {
        /// Property 6: `+` concatenation of Strings is associative.
        #[test]
        fn string_concatenation_is_associative(
            a in "[a-zA-Z0-9]{0,6}",
            b in "[a-zA-Z0-9]{0,6}",
            c in "[a-zA-Z0-9]{0,6}",
        ) {
            let left = run(&format!("print (\"{a}\" + \"{b}\") + \"{c}\";\n"));
            let right = run(&format!("print \"{a}\" + (\"{b}\" + \"{c}\");\n"));
            proptest::prop_assert_eq!(left, right);
        }
    }
}
