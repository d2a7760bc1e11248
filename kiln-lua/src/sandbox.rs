//! Lua sandbox creation
//!
//! Definitions are evaluated in a restricted sandbox without filesystem,
//! network or process access. Only the `pipeline` helper module is injected.

use mlua::{Lua, LuaOptions, Result as LuaResult, StdLib, Table};

/// Create a restricted Lua sandbox
///
/// Only TABLE, STRING and MATH are loaded. IO, OS, PACKAGE and DEBUG are
/// excluded and `require`, `dofile` and `loadfile` are removed, so a
/// definition cannot read the environment it is built in.
pub fn create_sandbox() -> LuaResult<Lua> {
    let lua = unsafe {
        Lua::unsafe_new_with(
            StdLib::TABLE | StdLib::STRING | StdLib::MATH,
            LuaOptions::default(),
        )
    };

    lua.globals().set("require", mlua::Nil)?;
    lua.globals().set("dofile", mlua::Nil)?;
    lua.globals().set("loadfile", mlua::Nil)?;

    register_pipeline_module(&lua)?;

    Ok(lua)
}

/// Register the `pipeline` helper module
///
/// - `pipeline.define(def)` returns `def` unchanged
/// - `pipeline.dependency(name, kind, opts)` builds a dependency entry
fn register_pipeline_module(lua: &Lua) -> LuaResult<()> {
    let pipeline = lua.create_table()?;

    let define_fn = lua.create_function(|_, definition: Table| Ok(definition))?;
    pipeline.set("define", define_fn)?;

    let dependency_fn = lua.create_function(
        |lua, (name, kind, opts): (String, String, Option<Table>)| {
            let entry = match opts {
                Some(opts) => opts,
                None => lua.create_table()?,
            };
            entry.set("name", name)?;
            entry.set("kind", kind)?;
            Ok(entry)
        },
    )?;
    pipeline.set("dependency", dependency_fn)?;

    lua.globals().set("pipeline", pipeline)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sandbox_basic_lua() {
        let lua = create_sandbox().unwrap();

        let result: i32 = lua
            .load(
                r#"
                local t = {a = 1, b = 2}
                return t.a + t.b
            "#,
            )
            .eval()
            .unwrap();
        assert_eq!(result, 3);

        let result: String = lua
            .load(r#"return string.format("%s-%s", "3.11", "bookworm")"#)
            .eval()
            .unwrap();
        assert_eq!(result, "3.11-bookworm");
    }

    #[test]
    fn test_sandbox_no_io() {
        let lua = create_sandbox().unwrap();

        let has_io: bool = lua.load(r#"return io ~= nil"#).eval().unwrap();
        assert!(!has_io);

        let has_os: bool = lua.load(r#"return os ~= nil"#).eval().unwrap();
        assert!(!has_os);
    }

    #[test]
    fn test_sandbox_no_require() {
        let lua = create_sandbox().unwrap();

        let result: LuaResult<()> = lua.load(r#"require("os")"#).exec();
        assert!(result.is_err());

        let result: LuaResult<()> = lua.load(r#"dofile("/etc/passwd")"#).exec();
        assert!(result.is_err());
    }

    #[test]
    fn test_pipeline_define_passthrough() {
        let lua = create_sandbox().unwrap();

        let name: String = lua
            .load(
                r#"
            local def = pipeline.define({ name = "build" })
            return def.name
        "#,
            )
            .eval()
            .unwrap();
        assert_eq!(name, "build");
    }

    #[test]
    fn test_pipeline_dependency_helper() {
        let lua = create_sandbox().unwrap();

        let source = r#"
            return pipeline.dependency("pyreadstat", "statistical-file-format", {
                collect_all = true,
            })
        "#;
        let dep: Table = lua.load(source).eval().unwrap();

        assert_eq!(dep.get::<String>("name").unwrap(), "pyreadstat");
        assert_eq!(dep.get::<String>("kind").unwrap(), "statistical-file-format");
        assert!(dep.get::<bool>("collect_all").unwrap());
    }
}
