//! Emits the generic `<float_type, int_type>` C++ header for a module that
//! has already passed every analyzer check.

use crate::compiler::ast::*;
use crate::compiler::codegen::expr::{ExprEnvironment, ExprPrinter, ModuleExprEnvironment};
use std::fmt::Write as _;

pub struct CodegenOutput {
    pub header_text: String,
}

/// Generates the header for `module`. Callers are expected to have already
/// run the full analyzer pipeline; this stage does not re-check anything.
pub fn generate(module: &Module) -> CodegenOutput {
    let env = ModuleExprEnvironment::new(module);
    let gen = Generator { module, env: &env };
    CodegenOutput {
        header_text: gen.run(),
    }
}

fn cpp_type_name(id: TypeId) -> &'static str {
    match id {
        TypeId::Void => "void",
        TypeId::Bool => "bool",
        TypeId::Int => "int_type",
        TypeId::Float => "float_type",
        TypeId::Vec2 => "vec2",
        TypeId::Vec3 => "vec3",
        TypeId::Vec4 => "vec4",
        TypeId::Vec2i => "vec2i",
        TypeId::Vec3i => "vec3i",
        TypeId::Vec4i => "vec4i",
        TypeId::Mat2 => "mat2",
        TypeId::Mat3 => "mat3",
        TypeId::Mat4 => "mat4",
    }
}

struct Generator<'a, E: ExprEnvironment> {
    module: &'a Module,
    env: &'a E,
}

impl<'a, E: ExprEnvironment> Generator<'a, E> {
    fn run(&self) -> String {
        let mut out = String::new();
        writeln!(out, "#pragma once").unwrap();
        writeln!(out).unwrap();
        writeln!(out, "#include <limits>").unwrap();
        writeln!(out, "#include \"pathway.h\"").unwrap();
        writeln!(out).unwrap();

        let namespaces: Vec<String> = self
            .module
            .export()
            .map(|e| e.path.clone())
            .unwrap_or_default();
        for ns in &namespaces {
            writeln!(out, "namespace {ns} {{").unwrap();
        }
        if !namespaces.is_empty() {
            writeln!(out).unwrap();
        }

        self.write_uniform_data(&mut out);
        writeln!(out).unwrap();
        self.write_varying_data(&mut out);
        writeln!(out).unwrap();
        self.write_func_defs(&mut out);

        for _ in &namespaces {
            writeln!(out, "}}").unwrap();
        }
        out
    }

    fn write_type_aliases(&self, out: &mut String) {
        writeln!(out, "    using vec2 = vector<float_type, 2>;").unwrap();
        writeln!(out, "    using vec3 = vector<float_type, 3>;").unwrap();
        writeln!(out, "    using vec4 = vector<float_type, 4>;").unwrap();
        writeln!(out, "    using vec2i = vector<int_type, 2>;").unwrap();
        writeln!(out, "    using vec3i = vector<int_type, 3>;").unwrap();
        writeln!(out, "    using vec4i = vector<int_type, 4>;").unwrap();
        writeln!(out, "    using mat2 = matrix<float_type, 2, 2>;").unwrap();
        writeln!(out, "    using mat3 = matrix<float_type, 3, 3>;").unwrap();
        writeln!(out, "    using mat4 = matrix<float_type, 4, 4>;").unwrap();
    }

    fn write_uniform_data(&self, out: &mut String) {
        writeln!(out, "template <typename float_type, typename int_type>").unwrap();
        writeln!(out, "struct uniform_data final {{").unwrap();
        self.write_type_aliases(out);
        writeln!(out).unwrap();
        for (_, var) in self.module.uniform_globals() {
            writeln!(out, "    {} {};", cpp_type_name(var.ty.id), var.name).unwrap();
        }
        writeln!(out, "}};").unwrap();
    }

    fn write_varying_data(&self, out: &mut String) {
        writeln!(out, "template <typename float_type, typename int_type>").unwrap();
        writeln!(out, "struct varying_data final {{").unwrap();
        self.write_type_aliases(out);
        writeln!(out, "    using uniform_data_type = uniform_data<float_type, int_type>;").unwrap();
        writeln!(out).unwrap();
        for (_, var) in self.module.varying_globals() {
            writeln!(out, "    {} {};", cpp_type_name(var.ty.id), var.name).unwrap();
        }
        writeln!(out).unwrap();

        for (func_id, func) in self.module.functions() {
            if func.is_pixel_sampler() {
                let params = self.param_list(func, &[]);
                writeln!(
                    out,
                    "    auto operator()(const uniform_data_type& frame, {params}) noexcept -> void;"
                )
                .unwrap();
            } else if func.is_pixel_encoder() {
                writeln!(
                    out,
                    "    auto operator()(const uniform_data_type& frame) const noexcept -> {};",
                    cpp_type_name(func.return_type.id)
                )
                .unwrap();
            } else {
                let prefix = self.frame_param_decl(func_id);
                let params = self.param_list(func, &[]);
                let joined = if prefix.is_empty() {
                    params
                } else if params.is_empty() {
                    prefix
                } else {
                    format!("{prefix}, {params}")
                };
                writeln!(
                    out,
                    "    auto {}({joined}) noexcept -> {};",
                    func.name,
                    cpp_type_name(func.return_type.id)
                )
                .unwrap();
            }
        }
        writeln!(out, "}};").unwrap();
    }

    fn frame_param_decl(&self, func_id: FuncId) -> String {
        if self.env.globals_usage(func_id).uses_uniform_globals {
            "const uniform_data_type& frame".to_string()
        } else {
            String::new()
        }
    }

    fn param_list(&self, func: &FuncDecl, skip: &[DeclId]) -> String {
        func.params
            .iter()
            .filter(|p| !skip.contains(p))
            .map(|p| {
                let var = self.module.var(*p);
                format!("{} {}", cpp_type_name(var.ty.id), var.name)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn write_func_defs(&self, out: &mut String) {
        for (func_id, func) in self.module.functions() {
            writeln!(out, "template <typename float_type, typename int_type>").unwrap();
            if func.is_pixel_sampler() {
                let params = self.param_list(func, &[]);
                writeln!(
                    out,
                    "auto varying_data<float_type, int_type>::operator()(const uniform_data_type& frame, {params}) noexcept -> void {{"
                )
                .unwrap();
            } else if func.is_pixel_encoder() {
                writeln!(
                    out,
                    "auto varying_data<float_type, int_type>::operator()(const uniform_data_type& frame) const noexcept -> {} {{",
                    cpp_type_name(func.return_type.id)
                )
                .unwrap();
            } else {
                let prefix = self.frame_param_decl(func_id);
                let params = self.param_list(func, &[]);
                let joined = if prefix.is_empty() {
                    params
                } else if params.is_empty() {
                    prefix
                } else {
                    format!("{prefix}, {params}")
                };
                writeln!(
                    out,
                    "auto varying_data<float_type, int_type>::{}({joined}) noexcept -> {} {{",
                    func.name,
                    cpp_type_name(func.return_type.id)
                )
                .unwrap();
            }
            self.write_stmt(&func.body, out, 1);
            writeln!(out, "}}").unwrap();
            writeln!(out).unwrap();
        }
    }

    fn write_stmt(&self, stmt: &Stmt, out: &mut String, indent: usize) {
        let pad = "    ".repeat(indent);
        let printer = ExprPrinter::new(self.env);
        match &stmt.kind {
            StmtKind::Assignment { lvalue, rvalue } => {
                writeln!(out, "{pad}{} = {};", printer.lower(lvalue), printer.lower(rvalue)).unwrap();
            }
            StmtKind::Decl(id) => {
                let var = self.module.var(*id);
                match &var.init {
                    Some(init) => writeln!(
                        out,
                        "{pad}{} {} = {};",
                        cpp_type_name(var.ty.id),
                        var.name,
                        printer.lower(init)
                    )
                    .unwrap(),
                    None => writeln!(out, "{pad}{} {};", cpp_type_name(var.ty.id), var.name).unwrap(),
                }
            }
            StmtKind::Return(expr) => {
                writeln!(out, "{pad}return {};", printer.lower(expr)).unwrap();
            }
            StmtKind::Compound(stmts) => {
                writeln!(out, "{pad}{{").unwrap();
                for s in stmts {
                    self.write_stmt(s, out, indent + 1);
                }
                writeln!(out, "{pad}}}").unwrap();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::lexer::Lexer;
    use crate::compiler::parser::Parser;
    use crate::compiler::resolve::resolve;

    fn generated(src: &str) -> String {
        let (tokens, _) = Lexer::new(src).tokenize();
        let (mut module, errors) = Parser::new(tokens).parse_module();
        assert!(errors.is_empty(), "parse errors: {errors:?}");
        resolve(&mut module);
        generate(&module).header_text
    }

    #[test]
    fn uniform_global_becomes_a_uniform_data_field() {
        let out = generated(
            "uniform float exposure;\n\
             void sample_pixel(vec2 a, vec2 b) {}\n\
             vec4 encode_pixel() { return vec4(0.0, 0.0, 0.0, 0.0); }\n",
        );
        assert!(out.contains("struct uniform_data final {"));
        assert!(out.contains("float_type exposure;"));
    }

    #[test]
    fn varying_global_becomes_a_varying_data_field() {
        let out = generated(
            "varying vec3 accum;\n\
             void sample_pixel(vec2 a, vec2 b) {}\n\
             vec4 encode_pixel() { return vec4(0.0, 0.0, 0.0, 0.0); }\n",
        );
        assert!(out.contains("vec3 accum;"));
    }

    #[test]
    fn sampler_and_encoder_become_call_operators() {
        let out = generated(
            "void sample_pixel(vec2 a, vec2 b) {}\n\
             vec4 encode_pixel() { return vec4(0.0, 0.0, 0.0, 0.0); }\n",
        );
        assert!(out.contains("operator()(const uniform_data_type& frame, vec2 a, vec2 b) noexcept -> void"));
        assert!(out.contains("operator()(const uniform_data_type& frame) const noexcept -> vec4"));
    }

    #[test]
    fn helper_referencing_uniform_global_gets_frame_parameter() {
        let out = generated(
            "uniform float exposure;\n\
             float scale(float v) { return v * exposure; }\n\
             void sample_pixel(vec2 a, vec2 b) {}\n\
             vec4 encode_pixel() { return vec4(0.0, 0.0, 0.0, 0.0); }\n",
        );
        assert!(out.contains("auto scale(const uniform_data_type& frame, float v) noexcept -> float_type;"));
    }

    #[test]
    fn helper_without_uniform_globals_has_no_frame_parameter() {
        let out = generated(
            "float scale(float v) { return v * 2.0; }\n\
             void sample_pixel(vec2 a, vec2 b) {}\n\
             vec4 encode_pixel() { return vec4(0.0, 0.0, 0.0, 0.0); }\n",
        );
        assert!(out.contains("auto scale(float v) noexcept -> float_type;"));
    }
}
