//! Name resolution pass — binds every `VarRef` and `FuncCall` to the
//! declarations it names.

use crate::compiler::ast::*;
use std::collections::HashMap;

/// Walks the module once, attaching resolutions in place. Never fails:
/// references that don't bind are simply left unresolved for the
/// resolution-check analyzer pass to report.
pub fn resolve(module: &mut Module) {
    let global_scope: HashMap<String, DeclId> = module
        .vars
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_global)
        .map(|(i, v)| (v.name.clone(), DeclId(i)))
        .collect();

    let mut func_names: HashMap<String, Vec<FuncId>> = HashMap::new();
    for (i, f) in module.funcs.iter().enumerate() {
        func_names.entry(f.name.clone()).or_default().push(FuncId(i));
    }

    let Module { funcs, vars, .. } = module;

    for func in funcs.iter_mut() {
        let mut top_scope = HashMap::new();
        for &param in &func.params {
            top_scope.insert(vars[param.0].name.clone(), param);
        }
        let mut scopes = vec![top_scope];
        let mut ctx = ResolveCtx {
            vars,
            scopes: &mut scopes,
            global_scope: &global_scope,
            func_names: &func_names,
        };
        ctx.resolve_stmt(&mut func.body);
    }
}

struct ResolveCtx<'a> {
    vars: &'a mut Vec<VarDecl>,
    scopes: &'a mut Vec<HashMap<String, DeclId>>,
    global_scope: &'a HashMap<String, DeclId>,
    func_names: &'a HashMap<String, Vec<FuncId>>,
}

impl<'a> ResolveCtx<'a> {
    fn lookup_var(&self, name: &str) -> Option<DeclId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
            .or_else(|| self.global_scope.get(name).copied())
    }

    fn resolve_stmt(&mut self, stmt: &mut Stmt) {
        match &mut stmt.kind {
            StmtKind::Assignment { lvalue, rvalue } => {
                self.resolve_expr(rvalue);
                self.resolve_expr(lvalue);
            }
            StmtKind::Decl(id) => {
                let id = *id;
                // Resolve the initializer *before* the name enters scope,
                // so `int x = x;` cannot bind to itself.
                if let Some(mut init) = self.vars[id.0].init.take() {
                    self.resolve_expr(&mut init);
                    self.vars[id.0].init = Some(init);
                }
                let name = self.vars[id.0].name.clone();
                self.scopes.last_mut().expect("a function body scope is always open").insert(name, id);
            }
            StmtKind::Return(expr) => self.resolve_expr(expr),
            StmtKind::Compound(stmts) => {
                self.scopes.push(HashMap::new());
                for s in stmts.iter_mut() {
                    self.resolve_stmt(s);
                }
                self.scopes.pop();
            }
        }
    }

    fn resolve_expr(&mut self, expr: &mut Expr) {
        match &mut expr.kind {
            ExprKind::IntLiteral(_)
            | ExprKind::FloatLiteral(_)
            | ExprKind::BoolLiteral(_)
            | ExprKind::PiLiteral
            | ExprKind::InfinityLiteral => {}
            ExprKind::VarRef(var_ref) => {
                var_ref.resolved = self.lookup_var(&var_ref.name);
            }
            ExprKind::GroupExpr(inner) => self.resolve_expr(inner),
            ExprKind::UnaryExpr { inner, .. } => self.resolve_expr(inner),
            ExprKind::BinaryExpr { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            ExprKind::FuncCall(call) => {
                for arg in call.args.iter_mut() {
                    self.resolve_expr(arg);
                }
                call.candidates = self.func_names.get(&call.name).cloned().unwrap_or_default();
            }
            ExprKind::TypeConstructor { args, .. } => {
                for arg in args.iter_mut() {
                    self.resolve_expr(arg);
                }
            }
            ExprKind::MemberExpr { base, .. } => self.resolve_expr(base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::lexer::Lexer;
    use crate::compiler::parser::Parser;

    fn resolved_module(src: &str) -> Module {
        let (tokens, _) = Lexer::new(src).tokenize();
        let (mut module, errors) = Parser::new(tokens).parse_module();
        assert!(errors.is_empty(), "parse errors: {errors:?}");
        resolve(&mut module);
        module
    }

    #[test]
    fn var_ref_resolves_to_global() {
        let module = resolved_module(
            "uniform float g_time;\n\
             void sample_pixel(vec2 a, vec2 b) { float t = g_time; }\n\
             vec4 encode_pixel() { return vec4(0.0, 0.0, 0.0, 0.0); }\n",
        );
        let body = match &module.funcs[0].body.kind {
            StmtKind::Compound(stmts) => stmts,
            _ => panic!("expected compound body"),
        };
        let init = match &body[0].kind {
            StmtKind::Decl(id) => module.var(*id).init.as_ref().unwrap(),
            _ => panic!("expected decl stmt"),
        };
        match &init.kind {
            ExprKind::VarRef(v) => assert!(v.resolved.is_some()),
            other => panic!("expected var ref, got {other:?}"),
        }
    }

    #[test]
    fn self_initializer_does_not_self_bind() {
        let module = resolved_module(
            "void sample_pixel(vec2 a, vec2 b) { int x = x; }\n\
             vec4 encode_pixel() { return vec4(0.0, 0.0, 0.0, 0.0); }\n",
        );
        let body = match &module.funcs[0].body.kind {
            StmtKind::Compound(stmts) => stmts,
            _ => panic!("expected compound body"),
        };
        let init = match &body[0].kind {
            StmtKind::Decl(id) => module.var(*id).init.as_ref().unwrap(),
            _ => panic!("expected decl stmt"),
        };
        match &init.kind {
            ExprKind::VarRef(v) => assert!(v.resolved.is_none()),
            other => panic!("expected var ref, got {other:?}"),
        }
    }

    #[test]
    fn func_call_queues_all_name_matching_candidates() {
        let module = resolved_module(
            "float add(float a, float b) { return a; }\n\
             vec2 add(vec2 a, vec2 b) { return a; }\n\
             void sample_pixel(vec2 a, vec2 b) { float r = add(1.0, 2.0); }\n\
             vec4 encode_pixel() { return vec4(0.0, 0.0, 0.0, 0.0); }\n",
        );
        let body = match &module.funcs[2].body.kind {
            StmtKind::Compound(stmts) => stmts,
            _ => panic!("expected compound body"),
        };
        let init = match &body[0].kind {
            StmtKind::Decl(id) => module.var(*id).init.as_ref().unwrap(),
            _ => panic!("expected decl stmt"),
        };
        match &init.kind {
            ExprKind::FuncCall(call) => assert_eq!(call.candidates.len(), 2),
            other => panic!("expected func call, got {other:?}"),
        }
    }

    #[test]
    fn resolution_is_idempotent() {
        let mut module = resolved_module(
            "uniform float g_time;\n\
             void sample_pixel(vec2 a, vec2 b) { float t = g_time; }\n\
             vec4 encode_pixel() { return vec4(0.0, 0.0, 0.0, 0.0); }\n",
        );
        let before = format!("{module:?}");
        resolve(&mut module);
        let after = format!("{module:?}");
        assert_eq!(before, after);
    }
}
