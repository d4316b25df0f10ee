//! The intermediate representation: types, expressions, statements,
//! declarations and the module that owns them.

use crate::compiler::tokens::Span;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeId {
    Void,
    Bool,
    Int,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Vec2i,
    Vec3i,
    Vec4i,
    Mat2,
    Mat3,
    Mat4,
}

impl TypeId {
    pub fn is_vector_or_matrix(self) -> bool {
        !matches!(self, TypeId::Void | TypeId::Bool | TypeId::Int | TypeId::Float)
    }

    pub fn is_vector(self) -> bool {
        matches!(
            self,
            TypeId::Vec2
                | TypeId::Vec3
                | TypeId::Vec4
                | TypeId::Vec2i
                | TypeId::Vec3i
                | TypeId::Vec4i
        )
    }

    pub fn is_int_vector(self) -> bool {
        matches!(self, TypeId::Vec2i | TypeId::Vec3i | TypeId::Vec4i)
    }

    pub fn is_float_vector(self) -> bool {
        matches!(self, TypeId::Vec2 | TypeId::Vec3 | TypeId::Vec4)
    }

    pub fn is_matrix(self) -> bool {
        matches!(self, TypeId::Mat2 | TypeId::Mat3 | TypeId::Mat4)
    }

    /// Number of vector components, undefined (`None`) for scalars and matrices.
    pub fn vector_component_count(self) -> Option<usize> {
        match self {
            TypeId::Vec2 | TypeId::Vec2i => Some(2),
            TypeId::Vec3 | TypeId::Vec3i => Some(3),
            TypeId::Vec4 | TypeId::Vec4i => Some(4),
            _ => None,
        }
    }

    /// The float-family vector of the same arity, used when a swizzle
    /// projects an int vector's component type back up to a vector.
    pub fn float_vector_of_size(size: usize) -> Option<TypeId> {
        match size {
            2 => Some(TypeId::Vec2),
            3 => Some(TypeId::Vec3),
            4 => Some(TypeId::Vec4),
            _ => None,
        }
    }

    pub fn int_vector_of_size(size: usize) -> Option<TypeId> {
        match size {
            2 => Some(TypeId::Vec2i),
            3 => Some(TypeId::Vec3i),
            4 => Some(TypeId::Vec4i),
            _ => None,
        }
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TypeId::Void => "void",
            TypeId::Bool => "bool",
            TypeId::Int => "int",
            TypeId::Float => "float",
            TypeId::Vec2 => "vec2",
            TypeId::Vec3 => "vec3",
            TypeId::Vec4 => "vec4",
            TypeId::Vec2i => "vec2i",
            TypeId::Vec3i => "vec3i",
            TypeId::Vec4i => "vec4i",
            TypeId::Mat2 => "mat2",
            TypeId::Mat3 => "mat3",
            TypeId::Mat4 => "mat4",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variability {
    Unbound,
    Uniform,
    Varying,
}

impl fmt::Display for Variability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Variability::Unbound => "unbound",
            Variability::Uniform => "uniform",
            Variability::Varying => "varying",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Type {
    pub id: TypeId,
    pub variability: Variability,
}

impl Type {
    pub fn new(id: TypeId, variability: Variability) -> Self {
        Self { id, variability }
    }

    pub fn unbound(id: TypeId) -> Self {
        Self::new(id, Variability::Unbound)
    }

    pub fn is_varying_or_unbound(self) -> bool {
        matches!(self.variability, Variability::Varying | Variability::Unbound)
    }

    pub fn is_uniform(self) -> bool {
        matches!(self.variability, Variability::Uniform)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.variability, self.id)
    }
}

/// Stable index into `Module::vars`. Used for every cross-reference
/// (`VarRef`, function parameters, `DeclStmt`) instead of a raw pointer so
/// the tree keeps a single owner while back-references stay valid under
/// mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclId(pub usize);

/// Stable index into `Module::funcs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    LogicalNot,
    BitwiseNot,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarRefExpr {
    pub name: String,
    /// Set by the resolver; `None` until resolved, left `None` forever if
    /// the name never binds to anything (reported by the resolution check).
    pub resolved: Option<DeclId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncCallExpr {
    pub name: String,
    pub args: Vec<Expr>,
    /// All name-matching functions, queued by the resolver for later
    /// disambiguation by type coercion. Empty before resolution.
    pub candidates: Vec<FuncId>,
}

impl FuncCallExpr {
    /// The call is resolved iff exactly one candidate survives.
    pub fn resolved(&self) -> Option<FuncId> {
        match self.candidates.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    IntLiteral(u64),
    FloatLiteral(f64),
    BoolLiteral(bool),
    /// Distinguished from a general `FloatLiteral` so the generator can
    /// emit a named constant rather than a decimal approximation.
    PiLiteral,
    InfinityLiteral,
    VarRef(VarRefExpr),
    GroupExpr(Box<Expr>),
    UnaryExpr { op: UnaryOp, inner: Box<Expr> },
    BinaryExpr { left: Box<Expr>, right: Box<Expr>, op: BinaryOp },
    FuncCall(FuncCallExpr),
    TypeConstructor { ty: Type, args: Vec<Expr> },
    MemberExpr { base: Box<Expr>, member: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Assignment { lvalue: Expr, rvalue: Expr },
    /// Local declaration; the `VarDecl` itself lives in `Module::vars` and
    /// is addressed by `DeclId`.
    Decl(DeclId),
    Return(Expr),
    Compound(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub ty: Type,
    pub name: String,
    pub init: Option<Expr>,
    pub is_global: bool,
    pub span: Span,
    pub name_span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub return_type: Type,
    pub name: String,
    /// Parameters, stored as `VarDecl`s in `Module::vars` like any other
    /// local so a `VarRef` inside the body resolves to them the same way.
    pub params: Vec<DeclId>,
    pub body: Stmt,
    pub span: Span,
    pub name_span: Span,
}

impl FuncDecl {
    pub fn is_pixel_sampler(&self) -> bool {
        self.name == "sample_pixel"
    }

    pub fn is_pixel_encoder(&self) -> bool {
        self.name == "encode_pixel"
    }

    pub fn is_entry_point(&self) -> bool {
        self.is_pixel_sampler() || self.is_pixel_encoder()
    }

    /// Mangled external identifier: base name plus one tag character (or
    /// digraph) per parameter type, used to disambiguate overloads that
    /// share an unmangled name.
    pub fn mangled_name(&self, module: &Module) -> String {
        let mut mangled = self.name.clone();
        for &param in &self.params {
            mangled.push_str(mangle_type_tag(module.var(param).ty.id));
        }
        mangled
    }
}

fn mangle_type_tag(id: TypeId) -> &'static str {
    match id {
        TypeId::Void => "",
        TypeId::Bool => "b",
        TypeId::Int => "i",
        TypeId::Float => "f",
        TypeId::Vec2 => "V2",
        TypeId::Vec3 => "V3",
        TypeId::Vec4 => "V4",
        TypeId::Vec2i => "I2",
        TypeId::Vec3i => "I3",
        TypeId::Vec4i => "I4",
        TypeId::Mat2 => "M22",
        TypeId::Mat3 => "M33",
        TypeId::Mat4 => "M44",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleExportDecl {
    pub path: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleImportDecl {
    pub path: Vec<String>,
    pub span: Span,
}

/// A top-level declaration in source order. Variable and function bodies
/// live in the module's arenas; this enum just records the order and kind
/// of what was declared at the top level.
#[derive(Debug, Clone, PartialEq)]
pub enum TopDecl {
    Var(DeclId),
    Func(FuncId),
    Export(ModuleExportDecl),
    Import(ModuleImportDecl),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Module {
    pub decls: Vec<TopDecl>,
    pub vars: Vec<VarDecl>,
    pub funcs: Vec<FuncDecl>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn var(&self, id: DeclId) -> &VarDecl {
        &self.vars[id.0]
    }

    pub fn var_mut(&mut self, id: DeclId) -> &mut VarDecl {
        &mut self.vars[id.0]
    }

    pub fn func(&self, id: FuncId) -> &FuncDecl {
        &self.funcs[id.0]
    }

    /// Appends a variable to the arena. Callers set `is_global` on `var`
    /// before calling this, so the "marked exactly once" invariant holds
    /// by construction rather than being re-derived here.
    pub fn push_var(&mut self, var: VarDecl) -> DeclId {
        let id = DeclId(self.vars.len());
        self.vars.push(var);
        id
    }

    pub fn push_func(&mut self, func: FuncDecl) -> FuncId {
        let id = FuncId(self.funcs.len());
        self.funcs.push(func);
        id
    }

    pub fn functions(&self) -> impl Iterator<Item = (FuncId, &FuncDecl)> {
        self.funcs.iter().enumerate().map(|(i, f)| (FuncId(i), f))
    }

    pub fn global_vars(&self) -> impl Iterator<Item = (DeclId, &VarDecl)> {
        self.vars
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_global)
            .map(|(i, v)| (DeclId(i), v))
    }

    pub fn uniform_globals(&self) -> impl Iterator<Item = (DeclId, &VarDecl)> {
        self.global_vars()
            .filter(|(_, v)| v.ty.variability == Variability::Uniform)
    }

    pub fn varying_globals(&self) -> impl Iterator<Item = (DeclId, &VarDecl)> {
        self.global_vars()
            .filter(|(_, v)| v.ty.variability != Variability::Uniform)
    }

    pub fn export(&self) -> Option<&ModuleExportDecl> {
        self.decls.iter().find_map(|d| match d {
            TopDecl::Export(e) => Some(e),
            _ => None,
        })
    }

    pub fn find_func_by_name(&self, name: &str) -> Vec<FuncId> {
        self.functions()
            .filter(|(_, f)| f.name == name)
            .map(|(id, _)| id)
            .collect()
    }
}
