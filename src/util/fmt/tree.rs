use std::io::Write;

use crate::{
    ast::{Entry, Expr, File},
    resolved,
};

const INDENT_WIDTH: usize = 2;

fn sp(w: &mut impl Write, i: usize) -> std::io::Result<()> {
    write!(w, "{:width$}", "", width = i * INDENT_WIDTH)
}

pub fn print_file_string(file: &File) -> String {
    let mut buf = Vec::with_capacity(1024);
    print_file(&mut buf, file).expect("writing to a vec can't fail");
    String::from_utf8(buf).expect("tree is valid UTF-8")
}

pub fn print_resolved_string(object: &resolved::Object) -> String {
    let mut buf = Vec::with_capacity(1024);
    print_resolved(&mut buf, object).expect("writing to a vec can't fail");
    String::from_utf8(buf).expect("tree is valid UTF-8")
}

/// Prints the raw tree, with the location of each node.
pub fn print_file(w: &mut impl Write, file: &File) -> std::io::Result<()> {
    for import in &file.imports {
        writeln!(
            w,
            "import {} {} ({})",
            import.name.name,
            import.path.value,
            import.location()
        )?;
    }
    print_expr_object(w, 0, &file.object)
}

fn print_expr_object(
    w: &mut impl Write,
    i: usize,
    object: &crate::ast::Object,
) -> std::io::Result<()> {
    sp(w, i)?;
    writeln!(w, "object ({})", object.location)?;
    for entry in &object.entries {
        match entry {
            Entry::Kv(kv) => {
                sp(w, i + 1)?;
                writeln!(w, "kv {}", kv.key.name)?;
                print_expr(w, i + 2, &kv.value)?;
            }
            Entry::Spread(spread) => {
                sp(w, i + 1)?;
                writeln!(w, "spread {} ({})", spread.var.dotted(), spread.location)?;
            }
        }
    }
    Ok(())
}

fn print_expr(w: &mut impl Write, i: usize, expr: &Expr) -> std::io::Result<()> {
    if let Expr::Object(object) = expr {
        return print_expr_object(w, i, object);
    }
    sp(w, i)?;
    match expr {
        Expr::Object(_) => unreachable!(),
        Expr::Array(array) => {
            writeln!(w, "array ({})", array.location)?;
            for element in &array.elements {
                print_expr(w, i + 1, element)?;
            }
            return Ok(());
        }
        Expr::Var(var) => write!(w, "var {}", var.dotted())?,
        Expr::Env(env) => write!(w, "env {}", env.name.name)?,
        Expr::Int(lit) => write!(w, "int {}", lit.value)?,
        Expr::Float(lit) => write!(w, "float {:?}", lit.value)?,
        Expr::String(lit) => write!(w, "string {:?}", lit.value)?,
        Expr::Bool(lit) => write!(w, "bool {}", lit.value)?,
        Expr::Spread(spread) => write!(w, "spread {}", spread.var.dotted())?,
    }
    writeln!(w, " ({})", expr.location())
}

/// Prints the resolved tree. Object members are written as `key: value`.
pub fn print_resolved(w: &mut impl Write, object: &resolved::Object) -> std::io::Result<()> {
    writeln!(w, "object")?;
    print_members(w, 1, object)
}

fn print_members(w: &mut impl Write, i: usize, object: &resolved::Object) -> std::io::Result<()> {
    for (key, value) in object.iter() {
        sp(w, i)?;
        write!(w, "{key}: ")?;
        print_value(w, i, value)?;
    }
    Ok(())
}

/// Writes the value at the current position, children one level below `i`.
fn print_value(w: &mut impl Write, i: usize, value: &resolved::Expr) -> std::io::Result<()> {
    use resolved::Expr;
    match value {
        Expr::Object(object) => {
            writeln!(w, "object")?;
            print_members(w, i + 1, object)
        }
        Expr::Array(elements) => {
            writeln!(w, "array")?;
            for element in elements {
                sp(w, i + 1)?;
                print_value(w, i + 1, element)?;
            }
            Ok(())
        }
        Expr::String(s) => writeln!(w, "string {s:?}"),
        Expr::Int(n) => writeln!(w, "int {n}"),
        Expr::Float(n) => writeln!(w, "float {n:?}"),
        Expr::Bool(b) => writeln!(w, "bool {b}"),
    }
}
