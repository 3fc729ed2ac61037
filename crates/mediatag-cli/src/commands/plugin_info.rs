//! `mediatag plugin-info`

use anyhow::Context;
use clap::Args;
use gst::prelude::*;
use serde::Serialize;

#[derive(Debug, Args)]
pub struct PluginInfoArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PluginInfo {
    plugin: String,
    description: String,
    version: String,
    license: String,
    package: String,
    element: String,
    long_name: String,
    klass: String,
    element_description: String,
    author: String,
    rank: String,
}

fn collect() -> anyhow::Result<PluginInfo> {
    mediatag_core::init().context("GStreamer initialization failed")?;
    if gst::ElementFactory::find(gstgobin::gobin::ELEMENT_NAME).is_none() {
        gstgobin::plugin_register_static().context("Failed to register the gobin plugin")?;
    }

    let factory = gst::ElementFactory::find(gstgobin::gobin::ELEMENT_NAME)
        .context("gobin factory missing after registration")?;
    let plugin = factory.plugin().context("gobin factory has no plugin")?;

    Ok(PluginInfo {
        plugin: plugin.plugin_name().to_string(),
        description: plugin.description().to_string(),
        version: plugin.version().to_string(),
        license: plugin.license().to_string(),
        package: plugin.package().to_string(),
        element: factory.name().to_string(),
        long_name: factory.longname().to_string(),
        klass: factory.klass().to_string(),
        element_description: factory.description().to_string(),
        author: factory.author().to_string(),
        rank: format!("{:?}", factory.rank()),
    })
}

pub fn run(args: PluginInfoArgs) -> anyhow::Result<()> {
    let info = collect()?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("Plugin:      {} {}", info.plugin, info.version);
        println!("  {}", info.description);
        println!("  License:   {}", info.license);
        println!("  Package:   {}", info.package);
        println!("Element:     {} ({})", info.element, info.long_name);
        println!("  Class:     {}", info.klass);
        println!("  {}", info.element_description);
        println!("  Author:    {}", info.author);
        println!("  Rank:      {}", info.rank);
    }
    Ok(())
}
