//! Default build definition
//!
//! `kiln init` writes this file. It spells out every default so the
//! definition documents itself; parsing it yields `BuildConfig::default()`.

/// Lua source of the default `kiln.lua`
pub fn default_definition() -> &'static str {
    r#"-- Kiln build definition
--
-- Every section is optional. Omitted sections keep the defaults shown here.
return pipeline.define({
    name = "survey-processor",

    -- Pushes to this branch and manual dispatches start a run.
    trigger = { branch = "main", manual = true },

    source = { repository = "." },

    -- Build container: <image>:<version>-<variant>
    runtime = {
        image = "docker.io/library/python",
        version = "3.11",
        variant = "bookworm",
        interpreter = "python",
    },

    -- Installed in order, unpinned. hidden_imports / collect_all declare
    -- what the packager cannot discover by scanning imports.
    dependencies = {
        pipeline.dependency("requests", "network-client"),
        pipeline.dependency("pandas", "tabular-data"),
        pipeline.dependency("pyreadstat", "statistical-file-format", {
            hidden_imports = {
                "pyreadstat._readstat_parser",
                "pyreadstat._readstat_writer",
            },
            collect_all = true,
        }),
        pipeline.dependency("numpy", "numeric-array"),
        pipeline.dependency("pyinstaller", "packaging-tool"),
    },

    package = {
        script = "simple_survey_processor.py",
        onefile = true,
        name = "Survey_Processor",
        hidden_imports = {
            "pyreadstat._readstat_parser",
            "pyreadstat._readstat_writer",
        },
        collect_all = { "pyreadstat" },
        -- "strict" fails the build on an undeclared hidden import,
        -- "permissive" only warns.
        capability_check = "strict",
        platform = "linux",
    },

    artifact = { name = "Survey_Processor" },
})
"#
}
