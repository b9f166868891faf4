use duct::cmd;

pub fn build_all_crates(release: bool, target: Option<&str>) -> anyhow::Result<()> {
    let mut build_args = vec!["build"];

    if let Some(target) = target {
        build_args.extend(["--target", target]);
    }

    if release {
        build_args.extend(["--profile", "release-lto"]);
    }

    cmd("cargo", build_args).run()?;
    Ok(())
}
