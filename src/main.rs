use anyhow::Result;

fn main() -> Result<()> {
    let matches = osdp_console::cli::parse_args();

    if matches.get_flag("list-ports") {
        return osdp_console::boot::list_ports();
    }

    osdp_console::boot::start(&matches)
}
