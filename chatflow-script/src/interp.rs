//! Tree-walking evaluator for step scripts.
//!
//! Evaluation is synchronous. `sender.send_message` calls are queued in an
//! outbox and handed back with the transition; the caller delivers them.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde_json::{Map, Number, Value as Json};

use crate::ast::{BinaryOp, Expr, ExprKind, FnDef, Item, Program, Stmt, StmtKind, UnaryOp};
use crate::error::RuntimeError;

/// Upper bound on evaluated statements per invocation.
const MAX_STEPS: usize = 100_000;

/// Module-level `let` bindings, evaluated once at compile time.
pub(crate) type Globals = HashMap<String, Json>;

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Data(Json),
    /// The delivery handle bound to the fourth parameter.
    Sender,
}

impl Value {
    fn into_data(self, line: usize) -> Result<Json, RuntimeError> {
        match self {
            Value::Data(json) => Ok(json),
            Value::Sender => Err(RuntimeError::new(
                line,
                "the sender handle cannot be stored or used as data",
            )),
        }
    }

    fn truthy(&self) -> bool {
        match self {
            Value::Sender => true,
            Value::Data(json) => truthy(json),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Outgoing {
    pub chat_id: String,
    pub text: String,
    pub options: Option<Json>,
}

#[derive(Debug)]
pub(crate) struct Completed {
    pub state_id: String,
    pub context: Map<String, Json>,
    pub outbox: Vec<Outgoing>,
}

enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

pub(crate) fn init_globals(program: &Program) -> Result<Globals, RuntimeError> {
    let empty = Globals::new();
    let mut interp = Interpreter::new(&empty);
    for item in &program.items {
        if let Item::Let { name, value, line } = item {
            interp.tick(*line)?;
            let value = interp.eval(value)?.into_data(*line)?;
            interp.locals.insert(name.clone(), Value::Data(value));
        }
    }
    Ok(interp
        .locals
        .into_iter()
        .filter_map(|(name, value)| match value {
            Value::Data(json) => Some((name, json)),
            Value::Sender => None,
        })
        .collect())
}

pub(crate) fn invoke(
    def: &FnDef,
    globals: &Globals,
    chat_id: &str,
    user_input: &Json,
    context: Map<String, Json>,
) -> Result<Completed, RuntimeError> {
    let mut interp = Interpreter::new(globals);
    let args = [
        Value::Data(Json::String(chat_id.to_string())),
        Value::Data(user_input.clone()),
        Value::Data(Json::Object(context)),
        Value::Sender,
    ];
    for (param, arg) in def.params.iter().zip(args) {
        interp.locals.insert(param.clone(), arg);
    }

    let returned = match interp.exec_block(&def.body)? {
        Flow::Return(value) => value,
        Flow::Normal => {
            return Err(RuntimeError::new(
                def.line,
                format!("function '{}' ended without returning (state_id, context)", def.name),
            ))
        }
        Flow::Break | Flow::Continue => {
            return Err(RuntimeError::new(def.line, "'break' or 'continue' outside a loop"))
        }
    };

    let (state_id, context) = match returned {
        Value::Data(Json::Array(mut pair)) if pair.len() == 2 => {
            let context = pair.pop();
            let state_id = pair.pop();
            match (state_id, context) {
                (Some(Json::String(state_id)), Some(Json::Object(context))) => (state_id, context),
                _ => return Err(bad_return(def)),
            }
        }
        _ => return Err(bad_return(def)),
    };

    Ok(Completed {
        state_id,
        context,
        outbox: interp.outbox,
    })
}

fn bad_return(def: &FnDef) -> RuntimeError {
    RuntimeError::new(
        def.line,
        format!(
            "function '{}' must return (state_id, context) with a string and a map",
            def.name
        ),
    )
}

struct Interpreter<'g> {
    globals: &'g Globals,
    locals: HashMap<String, Value>,
    outbox: Vec<Outgoing>,
    steps: usize,
}

enum PathKey {
    Field(String),
    Index(Json),
}

impl<'g> Interpreter<'g> {
    fn new(globals: &'g Globals) -> Self {
        Self {
            globals,
            locals: HashMap::new(),
            outbox: Vec::new(),
            steps: 0,
        }
    }

    fn tick(&mut self, line: usize) -> Result<(), RuntimeError> {
        self.steps += 1;
        if self.steps > MAX_STEPS {
            return Err(RuntimeError::new(line, "evaluation step limit exceeded"));
        }
        Ok(())
    }

    fn exec_block(&mut self, stmts: &[Stmt]) -> Result<Flow, RuntimeError> {
        for stmt in stmts {
            match self.exec(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        self.tick(stmt.line)?;
        match &stmt.kind {
            StmtKind::Let { name, value } => {
                let value = self.eval(value)?;
                self.locals.insert(name.clone(), value);
            }
            StmtKind::Assign { target, value } => {
                let value = self.eval(value)?;
                self.assign(target, value)?;
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Data(Json::Null),
                };
                return Ok(Flow::Return(value));
            }
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                let branch = if self.eval(cond)?.truthy() {
                    then_body
                } else {
                    else_body
                };
                return self.exec_block(branch);
            }
            StmtKind::For { var, iter, body } => {
                let items = match self.eval(iter)?.into_data(iter.line)? {
                    Json::Array(items) => items,
                    Json::Object(map) => {
                        map.into_iter().map(|(key, _)| Json::String(key)).collect()
                    }
                    Json::String(text) => text.chars().map(|c| Json::String(c.into())).collect(),
                    other => {
                        return Err(RuntimeError::new(
                            iter.line,
                            format!("cannot iterate over {}", type_name(&other)),
                        ))
                    }
                };
                for item in items {
                    self.locals.insert(var.clone(), Value::Data(item));
                    match self.exec_block(body)? {
                        Flow::Break => break,
                        Flow::Normal | Flow::Continue => {}
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
            }
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
            StmtKind::Import(_) => {
                return Err(RuntimeError::new(stmt.line, "imports are not supported"))
            }
            StmtKind::Expr(expr) => {
                self.eval(expr)?;
            }
        }
        Ok(Flow::Normal)
    }

    fn assign(&mut self, target: &Expr, value: Value) -> Result<(), RuntimeError> {
        let line = target.line;
        if let ExprKind::Ident(name) = &target.kind {
            if !self.locals.contains_key(name) {
                let message = if self.globals.contains_key(name) {
                    format!("cannot assign to module-level binding '{name}'")
                } else {
                    format!("assignment to undeclared variable '{name}', use 'let'")
                };
                return Err(RuntimeError::new(line, message));
            }
            self.locals.insert(name.clone(), value);
            return Ok(());
        }

        let value = value.into_data(line)?;
        let mut keys = Vec::new();
        let root = self.place_path(target, &mut keys)?;
        let Some((last, parents)) = keys.split_last() else {
            return Err(RuntimeError::new(line, "invalid assignment target"));
        };
        let slot = match self.locals.get_mut(&root) {
            Some(Value::Data(json)) => json,
            Some(Value::Sender) => {
                return Err(RuntimeError::new(line, "the sender handle cannot be modified"))
            }
            None => {
                return Err(RuntimeError::new(
                    line,
                    format!("cannot modify '{root}': not a local variable"),
                ))
            }
        };
        let mut current = slot;
        for key in parents {
            current = child_mut(current, key, line)?;
        }
        match (current, last) {
            (Json::Object(map), PathKey::Field(name)) => {
                map.insert(name.clone(), value);
            }
            (Json::Object(map), PathKey::Index(Json::String(key))) => {
                map.insert(key.clone(), value);
            }
            (Json::Array(items), PathKey::Index(index)) => {
                let position = array_position(items.len(), index, line)?;
                items[position] = value;
            }
            (other, _) => {
                return Err(RuntimeError::new(
                    line,
                    format!("cannot assign into {}", type_name(other)),
                ))
            }
        }
        Ok(())
    }

    /// Root variable of an assignable place, with evaluated keys pushed outermost first.
    fn place_path(&mut self, expr: &Expr, keys: &mut Vec<PathKey>) -> Result<String, RuntimeError> {
        match &expr.kind {
            ExprKind::Ident(name) => Ok(name.clone()),
            ExprKind::Attr { object, name } => {
                let root = self.place_path(object, keys)?;
                keys.push(PathKey::Field(name.clone()));
                Ok(root)
            }
            ExprKind::Index { object, index } => {
                let root = self.place_path(object, keys)?;
                let index = self.eval(index)?.into_data(expr.line)?;
                keys.push(PathKey::Index(index));
                Ok(root)
            }
            _ => Err(RuntimeError::new(expr.line, "invalid assignment target")),
        }
    }

    fn lookup(&self, name: &str, line: usize) -> Result<Value, RuntimeError> {
        if let Some(value) = self.locals.get(name) {
            return Ok(value.clone());
        }
        if let Some(value) = self.globals.get(name) {
            return Ok(Value::Data(value.clone()));
        }
        Err(RuntimeError::new(line, format!("name '{name}' is not defined")))
    }

    fn eval_data(&mut self, expr: &Expr) -> Result<Json, RuntimeError> {
        self.eval(expr)?.into_data(expr.line)
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        let line = expr.line;
        let json = match &expr.kind {
            ExprKind::Literal(value) => value.clone(),
            ExprKind::Ident(name) => return self.lookup(name, line),
            ExprKind::List(items) => Json::Array(
                items
                    .iter()
                    .map(|item| self.eval_data(item))
                    .collect::<Result<_, _>>()?,
            ),
            ExprKind::Map(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    let value = self.eval_data(value)?;
                    map.insert(key.clone(), value);
                }
                Json::Object(map)
            }
            ExprKind::Unary { op, operand } => {
                let value = self.eval(operand)?;
                match op {
                    UnaryOp::Not => Json::Bool(!value.truthy()),
                    UnaryOp::Neg => match num(&value.into_data(line)?) {
                        Some(Num::Int(n)) => match n.checked_neg() {
                            Some(n) => Json::from(n),
                            None => float(-(n as f64), line)?,
                        },
                        Some(Num::Float(f)) => float(-f, line)?,
                        None => return Err(RuntimeError::new(line, "'-' expects a number")),
                    },
                }
            }
            ExprKind::Binary { op, left, right } => match op {
                BinaryOp::And => {
                    let left = self.eval(left)?;
                    return if left.truthy() { self.eval(right) } else { Ok(left) };
                }
                BinaryOp::Or => {
                    let left = self.eval(left)?;
                    return if left.truthy() { Ok(left) } else { self.eval(right) };
                }
                op => {
                    let left = self.eval_data(left)?;
                    let right = self.eval_data(right)?;
                    binary(*op, left, right, line)?
                }
            },
            ExprKind::Attr { object, name } => match self.eval(object)? {
                Value::Data(Json::Object(mut map)) => map.remove(name).ok_or_else(|| {
                    RuntimeError::new(line, format!("map has no field '{name}'"))
                })?,
                Value::Data(other) => {
                    return Err(RuntimeError::new(
                        line,
                        format!("{} has no field '{name}'", type_name(&other)),
                    ))
                }
                Value::Sender => {
                    return Err(RuntimeError::new(line, format!("sender has no field '{name}'")))
                }
            },
            ExprKind::Index { object, index } => {
                let object = self.eval_data(object)?;
                let index = self.eval_data(index)?;
                index_value(object, &index, line)?
            }
            ExprKind::MethodCall { object, name, args } => {
                let object = self.eval(object)?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                return self.method(object, name, args, line);
            }
            ExprKind::Call { callee, args } => {
                let ExprKind::Ident(name) = &callee.kind else {
                    return Err(RuntimeError::new(line, "expression is not callable"));
                };
                let args = args
                    .iter()
                    .map(|arg| self.eval_data(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                builtin(name, args, line)?
            }
        };
        Ok(Value::Data(json))
    }

    fn method(
        &mut self,
        object: Value,
        name: &str,
        args: Vec<Value>,
        line: usize,
    ) -> Result<Value, RuntimeError> {
        let object = match object {
            Value::Sender => return self.sender_method(name, args, line).map(Value::Data),
            Value::Data(json) => json,
        };
        let args = args
            .into_iter()
            .map(|arg| arg.into_data(line))
            .collect::<Result<Vec<_>, _>>()?;
        let result = match (&object, name) {
            (Json::String(s), "lower") => Json::String(s.to_lowercase()),
            (Json::String(s), "upper") => Json::String(s.to_uppercase()),
            (Json::String(s), "trim") => Json::String(s.trim().to_string()),
            (Json::String(s), "starts_with") => {
                Json::Bool(s.starts_with(str_arg(&args, 0, name, line)?))
            }
            (Json::String(s), "ends_with") => {
                Json::Bool(s.ends_with(str_arg(&args, 0, name, line)?))
            }
            (Json::String(s), "contains") => Json::Bool(s.contains(str_arg(&args, 0, name, line)?)),
            (Json::String(s), "split") => {
                let parts: Vec<Json> = if args.is_empty() {
                    s.split_whitespace().map(|p| Json::String(p.into())).collect()
                } else {
                    s.split(str_arg(&args, 0, name, line)?)
                        .map(|p| Json::String(p.into()))
                        .collect()
                };
                Json::Array(parts)
            }
            (Json::String(_) | Json::Array(_) | Json::Object(_), "len") => {
                builtin("len", vec![object.clone()], line)?
            }
            (Json::Array(items), "contains") => {
                let needle = any_arg(&args, 0, name, line)?;
                Json::Bool(items.iter().any(|item| values_equal(item, needle)))
            }
            (Json::Object(map), "get") => {
                let key = str_arg(&args, 0, name, line)?;
                map.get(key)
                    .cloned()
                    .unwrap_or_else(|| args.get(1).cloned().unwrap_or(Json::Null))
            }
            (Json::Object(map), "keys") => {
                Json::Array(map.keys().map(|k| Json::String(k.clone())).collect())
            }
            (Json::Object(map), "values") => Json::Array(map.values().cloned().collect()),
            (Json::Object(map), "contains") => {
                Json::Bool(map.contains_key(str_arg(&args, 0, name, line)?))
            }
            (other, _) => {
                return Err(RuntimeError::new(
                    line,
                    format!("{} has no method '{name}'", type_name(other)),
                ))
            }
        };
        Ok(Value::Data(result))
    }

    fn sender_method(
        &mut self,
        name: &str,
        args: Vec<Value>,
        line: usize,
    ) -> Result<Json, RuntimeError> {
        if name != "send_message" {
            return Err(RuntimeError::new(line, format!("sender has no method '{name}'")));
        }
        if !(2..=3).contains(&args.len()) {
            return Err(RuntimeError::new(
                line,
                format!("send_message expects 2 or 3 arguments, got {}", args.len()),
            ));
        }
        let mut args = args.into_iter().map(|arg| arg.into_data(line));
        let chat_id = match args.next().transpose()? {
            Some(Json::String(chat_id)) => chat_id,
            _ => return Err(RuntimeError::new(line, "send_message expects a string chat id")),
        };
        let text = match args.next().transpose()? {
            Some(Json::String(text)) => text,
            Some(other) => display(&other),
            None => String::new(),
        };
        let options = args.next().transpose()?.filter(|options| !options.is_null());
        self.outbox.push(Outgoing {
            chat_id,
            text,
            options,
        });
        Ok(Json::Null)
    }
}

fn child_mut<'j>(
    json: &'j mut Json,
    key: &PathKey,
    line: usize,
) -> Result<&'j mut Json, RuntimeError> {
    match (json, key) {
        (Json::Object(map), PathKey::Field(name) | PathKey::Index(Json::String(name))) => map
            .get_mut(name)
            .ok_or_else(|| RuntimeError::new(line, format!("key '{name}' not found"))),
        (Json::Array(items), PathKey::Index(index)) => {
            let position = array_position(items.len(), index, line)?;
            Ok(&mut items[position])
        }
        (other, _) => Err(RuntimeError::new(
            line,
            format!("cannot index into {}", type_name(other)),
        )),
    }
}

fn array_position(len: usize, index: &Json, line: usize) -> Result<usize, RuntimeError> {
    let Some(raw) = index.as_i64() else {
        return Err(RuntimeError::new(line, "list index must be an integer"));
    };
    let position = if raw < 0 { len as i64 + raw } else { raw };
    if position < 0 || position as usize >= len {
        return Err(RuntimeError::new(line, format!("list index {raw} out of range")));
    }
    Ok(position as usize)
}

fn index_value(object: Json, index: &Json, line: usize) -> Result<Json, RuntimeError> {
    match (object, index) {
        (Json::Object(mut map), Json::String(key)) => map
            .remove(key)
            .ok_or_else(|| RuntimeError::new(line, format!("key '{key}' not found"))),
        (Json::Array(mut items), index) => {
            let position = array_position(items.len(), index, line)?;
            Ok(items.swap_remove(position))
        }
        (Json::String(text), index) => {
            let chars: Vec<char> = text.chars().collect();
            let position = array_position(chars.len(), index, line)?;
            Ok(Json::String(chars[position].into()))
        }
        (other, _) => Err(RuntimeError::new(
            line,
            format!("cannot index into {}", type_name(&other)),
        )),
    }
}

fn any_arg<'a>(
    args: &'a [Json],
    at: usize,
    method: &str,
    line: usize,
) -> Result<&'a Json, RuntimeError> {
    args.get(at)
        .ok_or_else(|| {
            RuntimeError::new(line, format!("'{method}' is missing argument {}", at + 1))
        })
}

fn str_arg<'a>(
    args: &'a [Json],
    at: usize,
    method: &str,
    line: usize,
) -> Result<&'a str, RuntimeError> {
    any_arg(args, at, method, line)?
        .as_str()
        .ok_or_else(|| RuntimeError::new(line, format!("'{method}' expects a string argument")))
}

fn builtin(name: &str, args: Vec<Json>, line: usize) -> Result<Json, RuntimeError> {
    let arity = |expected: &[usize]| {
        if expected.contains(&args.len()) {
            Ok(())
        } else {
            Err(RuntimeError::new(
                line,
                format!("{name}() takes {expected:?} arguments, got {}", args.len()),
            ))
        }
    };
    match name {
        "len" => {
            arity(&[1])?;
            let len = match &args[0] {
                Json::String(s) => s.chars().count(),
                Json::Array(items) => items.len(),
                Json::Object(map) => map.len(),
                other => {
                    return Err(RuntimeError::new(
                        line,
                        format!("{} has no length", type_name(other)),
                    ))
                }
            };
            Ok(Json::from(len))
        }
        "str" => {
            arity(&[1])?;
            Ok(Json::String(display(&args[0])))
        }
        "int" => {
            arity(&[1])?;
            let value = match &args[0] {
                Json::Bool(b) => i64::from(*b),
                Json::Number(n) => match n.as_i64() {
                    Some(i) => i,
                    None => n.as_f64().map(|f| f.trunc() as i64).unwrap_or_default(),
                },
                Json::String(s) => s.trim().parse::<i64>().map_err(|_| {
                    RuntimeError::new(line, format!("invalid literal for int(): '{s}'"))
                })?,
                other => {
                    return Err(RuntimeError::new(
                        line,
                        format!("int() cannot convert {}", type_name(other)),
                    ))
                }
            };
            Ok(Json::from(value))
        }
        "float" => {
            arity(&[1])?;
            let value = match &args[0] {
                Json::Bool(b) => f64::from(u8::from(*b)),
                Json::Number(n) => n.as_f64().unwrap_or_default(),
                Json::String(s) => s.trim().parse::<f64>().map_err(|_| {
                    RuntimeError::new(line, format!("invalid literal for float(): '{s}'"))
                })?,
                other => {
                    return Err(RuntimeError::new(
                        line,
                        format!("float() cannot convert {}", type_name(other)),
                    ))
                }
            };
            float(value, line)
        }
        "type_of" => {
            arity(&[1])?;
            Ok(Json::String(type_name(&args[0]).to_string()))
        }
        "keys" => {
            arity(&[1])?;
            match &args[0] {
                Json::Object(map) => Ok(Json::Array(
                    map.keys().map(|k| Json::String(k.clone())).collect(),
                )),
                other => Err(RuntimeError::new(
                    line,
                    format!("keys() expects a map, got {}", type_name(other)),
                )),
            }
        }
        "getattr" => {
            arity(&[2, 3])?;
            let mut args = args.into_iter();
            let (object, field, default) = (args.next(), args.next(), args.next());
            let Some(Json::String(field)) = field else {
                return Err(RuntimeError::new(line, "getattr() field name must be a string"));
            };
            let found = match object {
                Some(Json::Object(mut map)) => map.remove(&field),
                _ => None,
            };
            found.or(default).ok_or_else(|| {
                RuntimeError::new(line, format!("object has no attribute '{field}'"))
            })
        }
        other => Err(RuntimeError::new(line, format!("unknown function '{other}'"))),
    }
}

fn binary(op: BinaryOp, left: Json, right: Json, line: usize) -> Result<Json, RuntimeError> {
    match op {
        BinaryOp::Eq => return Ok(Json::Bool(values_equal(&left, &right))),
        BinaryOp::NotEq => return Ok(Json::Bool(!values_equal(&left, &right))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(&left, &right).ok_or_else(|| {
                RuntimeError::new(
                    line,
                    format!(
                        "cannot compare {} with {}",
                        type_name(&left),
                        type_name(&right)
                    ),
                )
            })?;
            let result = match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            return Ok(Json::Bool(result));
        }
        BinaryOp::In => {
            let found = match (&left, &right) {
                (Json::String(key), Json::Object(map)) => map.contains_key(key),
                (needle, Json::Array(items)) => items.iter().any(|item| values_equal(item, needle)),
                (Json::String(needle), Json::String(haystack)) => {
                    haystack.contains(needle.as_str())
                }
                _ => {
                    return Err(RuntimeError::new(
                        line,
                        format!(
                            "'in' is not supported between {} and {}",
                            type_name(&left),
                            type_name(&right)
                        ),
                    ))
                }
            };
            return Ok(Json::Bool(found));
        }
        _ => {}
    }

    if op == BinaryOp::Add {
        match (&left, &right) {
            (Json::String(a), Json::String(b)) => return Ok(Json::String(format!("{a}{b}"))),
            (Json::Array(a), Json::Array(b)) => {
                return Ok(Json::Array(a.iter().chain(b).cloned().collect()))
            }
            _ => {}
        }
    }

    let (Some(a), Some(b)) = (num(&left), num(&right)) else {
        return Err(RuntimeError::new(
            line,
            format!(
                "unsupported operand types for {op:?}: {} and {}",
                type_name(&left),
                type_name(&right)
            ),
        ));
    };

    if let (Num::Int(a), Num::Int(b)) = (a, b) {
        let checked = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => a.checked_mul(b),
            BinaryOp::Rem if b == 0 => {
                return Err(RuntimeError::new(line, "integer modulo by zero"))
            }
            BinaryOp::Rem => a
                .checked_rem(b)
                .map(|r| if r != 0 && (r < 0) != (b < 0) { r + b } else { r }),
            _ => None,
        };
        if let Some(value) = checked {
            return Ok(Json::from(value));
        }
    }

    let (a, b) = (a.as_f64(), b.as_f64());
    let value = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div | BinaryOp::Rem if b == 0.0 => {
            return Err(RuntimeError::new(line, "division by zero"))
        }
        BinaryOp::Div => a / b,
        BinaryOp::Rem => a - b * (a / b).floor(),
        other => {
            return Err(RuntimeError::new(
                line,
                format!("unsupported arithmetic operator {other:?}"),
            ))
        }
    };
    float(value, line)
}

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }
}

fn num(json: &Json) -> Option<Num> {
    let Json::Number(n) = json else {
        return None;
    };
    n.as_i64()
        .map(Num::Int)
        .or_else(|| n.as_f64().map(Num::Float))
}

fn float(value: f64, line: usize) -> Result<Json, RuntimeError> {
    Number::from_f64(value)
        .map(Json::Number)
        .ok_or_else(|| RuntimeError::new(line, "arithmetic produced a non-finite number"))
}

fn values_equal(a: &Json, b: &Json) -> bool {
    match (a, b) {
        (Json::Number(_), Json::Number(_)) => compare(a, b) == Some(Ordering::Equal),
        (Json::Array(x), Json::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| values_equal(l, r))
        }
        (Json::Object(x), Json::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, l)| y.get(key).is_some_and(|r| values_equal(l, r)))
        }
        _ => a == b,
    }
}

fn compare(a: &Json, b: &Json) -> Option<Ordering> {
    match (a, b) {
        (Json::String(x), Json::String(y)) => Some(x.cmp(y)),
        _ => match (num(a)?, num(b)?) {
            (Num::Int(x), Num::Int(y)) => Some(x.cmp(&y)),
            (x, y) => x.as_f64().partial_cmp(&y.as_f64()),
        },
    }
}

fn truthy(json: &Json) -> bool {
    match json {
        Json::Null => false,
        Json::Bool(b) => *b,
        Json::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Json::String(s) => !s.is_empty(),
        Json::Array(items) => !items.is_empty(),
        Json::Object(map) => !map.is_empty(),
    }
}

fn display(json: &Json) -> String {
    match json {
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn type_name(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(n) if n.is_f64() => "float",
        Json::Number(_) => "int",
        Json::String(_) => "string",
        Json::Array(_) => "list",
        Json::Object(_) => "map",
    }
}
