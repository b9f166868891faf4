use duct::cmd;

pub fn doc_crate(private: bool, open: bool, lib: bool) -> anyhow::Result<()> {
    let mut build_args = vec!["doc", "--no-deps"];
    if lib {
        build_args.extend(["-p", "bootmenu-rs-core"]);
    }
    if private {
        build_args.push("--document-private-items");
    }
    if open {
        build_args.push("--open");
    }

    cmd("cargo", build_args).run()?;
    Ok(())
}
