//! Denylist check over a parsed step script.
//!
//! This is NOT a security boundary. It rejects imports and a fixed list of
//! dangerous names, but anything reachable without spelling one of those names
//! passes: `getattr(context, "o" + "s")` validates. The interpreter carries no
//! OS, file, process or network capability of its own.

use crate::ast::{Expr, ExprKind, Import, Item, Program, Stmt, StmtKind};
use crate::error::SecurityError;

/// Names inline handlers may not reference, bind or reach as attributes.
pub const DENYLIST: &[&str] = &[
    "os",
    "sys",
    "subprocess",
    "shutil",
    "socket",
    "eval",
    "exec",
    "compile",
    "open",
    "file",
    "__import__",
    "importlib",
    "__builtins__",
    "builtins",
    "globals",
    "locals",
    "vars",
];

pub fn is_denied(name: &str) -> bool {
    DENYLIST.contains(&name)
}

/// Walk every node of `program`, failing on the first violation.
pub fn validate(program: &Program) -> Result<(), SecurityError> {
    for item in &program.items {
        match item {
            Item::Fn(def) => {
                for stmt in &def.body {
                    check_stmt(stmt)?;
                }
            }
            Item::Let { name, value, line } => {
                check_binding(name, *line)?;
                check_expr(value)?;
            }
            Item::Import(import) => return Err(import_error(import)),
        }
    }
    Ok(())
}

fn import_error(import: &Import) -> SecurityError {
    SecurityError {
        line: import.line(),
        reason: format!("import of '{}' is not allowed", import.module()),
    }
}

fn check_binding(name: &str, line: usize) -> Result<(), SecurityError> {
    if is_denied(name) {
        return Err(SecurityError {
            line,
            reason: format!("binding to restricted name '{name}'"),
        });
    }
    Ok(())
}

fn check_block(stmts: &[Stmt]) -> Result<(), SecurityError> {
    stmts.iter().try_for_each(check_stmt)
}

fn check_stmt(stmt: &Stmt) -> Result<(), SecurityError> {
    match &stmt.kind {
        StmtKind::Let { name, value } => {
            check_binding(name, stmt.line)?;
            check_expr(value)
        }
        StmtKind::Assign { target, value } => {
            if let ExprKind::Ident(name) = &target.kind {
                check_binding(name, stmt.line)?;
            }
            check_expr(target)?;
            check_expr(value)
        }
        StmtKind::Return(value) => value.as_ref().map_or(Ok(()), check_expr),
        StmtKind::If {
            cond,
            then_body,
            else_body,
        } => {
            check_expr(cond)?;
            check_block(then_body)?;
            check_block(else_body)
        }
        StmtKind::For { var, iter, body } => {
            check_binding(var, stmt.line)?;
            check_expr(iter)?;
            check_block(body)
        }
        StmtKind::Break | StmtKind::Continue => Ok(()),
        StmtKind::Import(import) => Err(import_error(import)),
        StmtKind::Expr(expr) => check_expr(expr),
    }
}

fn check_expr(expr: &Expr) -> Result<(), SecurityError> {
    match &expr.kind {
        ExprKind::Literal(_) => Ok(()),
        ExprKind::Ident(name) => {
            if is_denied(name) {
                return Err(SecurityError {
                    line: expr.line,
                    reason: format!("use of restricted name '{name}'"),
                });
            }
            Ok(())
        }
        ExprKind::List(items) => items.iter().try_for_each(check_expr),
        ExprKind::Map(entries) => entries.iter().try_for_each(|(_, value)| check_expr(value)),
        ExprKind::Unary { operand, .. } => check_expr(operand),
        ExprKind::Binary { left, right, .. } => {
            check_expr(left)?;
            check_expr(right)
        }
        ExprKind::Attr { object, name } => {
            check_attr(name, expr.line)?;
            check_expr(object)
        }
        ExprKind::MethodCall { object, name, args } => {
            check_attr(name, expr.line)?;
            check_expr(object)?;
            args.iter().try_for_each(check_expr)
        }
        ExprKind::Index { object, index } => {
            check_expr(object)?;
            check_expr(index)
        }
        ExprKind::Call { callee, args } => {
            check_expr(callee)?;
            args.iter().try_for_each(check_expr)
        }
    }
}

fn check_attr(name: &str, line: usize) -> Result<(), SecurityError> {
    if is_denied(name) {
        return Err(SecurityError {
            line,
            reason: format!("access to restricted attribute '{name}'"),
        });
    }
    Ok(())
}
