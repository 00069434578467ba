use nerdctl_shim::bootstrap::load_command_tree;
use nerdctl_shim::cleanup::{Outcome, run_cleanups};
use nerdctl_shim::handlers::PathTranslator;
use nerdctl_shim::test_utils::args;
use nerdctl_shim::{CommandTree, ParseError, ParsedArgs, Parser};

use std::sync::Arc;
use tempfile::TempDir;

fn shipped_tree() -> CommandTree {
    let translator = PathTranslator::new("/mnt").unwrap();
    load_command_tree(Arc::new(translator)).unwrap()
}

fn parse(tree: &CommandTree, input: &[&str]) -> Result<ParsedArgs, ParseError> {
    Parser::new(tree).parse(&args(input))
}

fn translate(tree: &CommandTree, input: &[&str]) -> Vec<String> {
    parse(tree, input).unwrap().args
}

#[test]
fn test_run_shortcut_translates_volume_source() {
    let tree = shipped_tree();
    assert_eq!(
        translate(&tree, &["run", "--rm", "-v", r"C:\src:/app", "alpine", "ls", "-v"]),
        args(&["run", "--rm", "-v", "/mnt/c/src:/app", "alpine", "ls", "-v"])
    );
}

#[test]
fn test_shortcut_and_full_command_agree() {
    let tree = shipped_tree();
    let suffix = [
        "--volume",
        r"D:\data:/data:ro",
        "--env-file=C:/env.list",
        "-i",
        "alpine",
    ];
    for name in ["run", "create"] {
        let mut short = vec![name];
        short.extend(suffix);
        let mut full = vec!["container", name];
        full.extend(suffix);

        let through_alias = translate(&tree, &short);
        let through_target = translate(&tree, &full);
        assert_eq!(through_alias[1..], through_target[2..], "{name}");
    }
}

#[test]
fn test_global_options_are_accepted_after_subcommands() {
    let tree = shipped_tree();
    assert_eq!(
        translate(
            &tree,
            &["container", "run", "--namespace", "k8s.io", "--env-file", r"C:\app\.env", "nginx"]
        ),
        args(&[
            "container",
            "run",
            "--namespace",
            "k8s.io",
            "--env-file",
            "/mnt/c/app/.env",
            "nginx"
        ])
    );
    assert_eq!(
        translate(&tree, &["--debug", "-n", "default", "ps", "-a"]),
        args(&["--debug", "-n", "default", "ps", "-a"])
    );
}

#[test]
fn test_compose_file_options() {
    let tree = shipped_tree();
    assert_eq!(
        translate(
            &tree,
            &[
                "compose",
                "-f",
                r"C:\proj\compose.yaml",
                "--project-directory=C:\\proj",
                "up",
                "-d",
            ]
        ),
        args(&[
            "compose",
            "-f",
            "/mnt/c/proj/compose.yaml",
            "--project-directory=/mnt/c/proj",
            "up",
            "-d",
        ])
    );
}

#[test]
fn test_build_translates_dockerfile_and_context() {
    let tree = shipped_tree();
    let expected = args(&["-t", "app", "-f", "/mnt/c/x/Dockerfile", "/mnt/c/x"]);
    for prefix in [&["build"][..], &["image", "build"][..]] {
        let mut input = prefix.to_vec();
        input.extend(["-t", "app", "-f", r"C:\x\Dockerfile", r"C:\x"]);
        let translated = translate(&tree, &input);
        assert_eq!(translated[prefix.len()..], expected[..]);
    }
}

#[test]
fn test_image_load_and_save_paths() {
    let tree = shipped_tree();
    let parsed = parse(&tree, &["load", "-i", r"C:\images\app.tar"]).unwrap();
    assert_eq!(parsed.args, args(&["load", "-i", "/mnt/c/images/app.tar"]));
    assert!(parsed.cleanups.is_empty());

    let parsed = parse(&tree, &["image", "save", "--output", "-", "alpine"]).unwrap();
    assert_eq!(parsed.args, args(&["image", "save", "--output", "-", "alpine"]));
}

#[test]
fn test_new_output_file_is_removed_when_the_tool_fails() {
    let tree = shipped_tree();
    let temp = TempDir::new().unwrap();
    let cidfile = temp.path().join("container.id");
    let cidfile_arg = cidfile.to_str().unwrap();

    let parsed = parse(&tree, &["run", "--cidfile", cidfile_arg, "alpine"]).unwrap();
    assert_eq!(parsed.args[2], cidfile_arg);
    assert_eq!(parsed.cleanups.len(), 1);

    std::fs::write(&cidfile, "abc123").unwrap();
    assert_eq!(run_cleanups(parsed.cleanups, Outcome::Failure), 0);
    assert!(!cidfile.exists());
}

#[test]
fn test_new_output_file_is_kept_when_the_tool_succeeds() {
    let tree = shipped_tree();
    let temp = TempDir::new().unwrap();
    let pidfile = temp.path().join("container.pid");

    let parsed = parse(
        &tree,
        &["container", "create", "--pidfile", pidfile.to_str().unwrap(), "alpine"],
    )
    .unwrap();
    std::fs::write(&pidfile, "42").unwrap();
    run_cleanups(parsed.cleanups, Outcome::Success);
    assert!(pidfile.exists());
}

#[test]
fn test_unknown_option_is_rejected() {
    let tree = shipped_tree();
    match parse(&tree, &["run", "--bogus", "x", "alpine"]).unwrap_err() {
        ParseError::UnsupportedOption { command, option } => {
            assert_eq!(command, "container run");
            assert_eq!(option, "--bogus");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_untranslatable_volume_reports_the_option() {
    let tree = shipped_tree();
    let err = parse(&tree, &["run", "-v", r"\\fileserver\share:/data", "alpine"]).unwrap_err();
    assert!(matches!(err, ParseError::Handler { .. }));
    let message = err.to_string();
    assert!(message.contains("invalid value for option -v"), "{message}");
    assert!(message.contains("fileserver"), "{message}");
}

#[test]
fn test_commands_without_handlers_pass_through() {
    let tree = shipped_tree();
    for input in [
        &["ps", "-a", "--format", "{{.ID}}"][..],
        &["images", "-q"][..],
        &["version"][..],
        &["volume", "create", "--label", "a=b", "data"][..],
    ] {
        assert_eq!(translate(&tree, input), args(input));
    }
}

#[test]
fn test_every_option_resolves_under_both_dash_spellings() {
    let tree = shipped_tree();
    let parser = Parser::new(&tree);

    for (path, id) in tree.paths() {
        for (spelling, handler) in tree.node(id).options() {
            let counterpart = match spelling.strip_prefix("--") {
                Some(long) => format!("-{long}"),
                None => format!("-{spelling}"),
            };
            for token in [spelling.as_str(), counterpart.as_str()] {
                let resolved = parser
                    .resolve_option(id, token, Some("/value"))
                    .unwrap_or_else(|f| panic!("{path:?} {token}: {}", f.error));
                assert_eq!(
                    resolved.consumed_next,
                    handler.takes_value(),
                    "{path:?} {token}"
                );
            }
        }
    }
}
