use crate::{
    InfoArgs, MountOptions, OutputFormat,
    output::{
        OutputStyle, create_table, format_bytes, format_path, header_cell, print_section_header,
        regular_cell,
    },
};

pub fn handle(
    args: InfoArgs,
    options: &MountOptions,
    format: OutputFormat,
    style: &OutputStyle,
) -> anyhow::Result<()> {
    let container = options.mount(&args.path)?;
    let info = container.info();

    if let Some(json) = format.to_json(&info)? {
        println!("{json}");
        return Ok(());
    }

    print_section_header("Package Information", style);
    println!("{}", format_path(&info.path.display().to_string(), style));

    let mut table = create_table(style);
    table.set_header(vec![header_cell("Field", style), header_cell("Value", style)]);

    let volume = match &info.svod_layout {
        Some(layout) => format!("{} ({layout})", info.volume_type),
        None if info.read_only => format!("{} (read-only)", info.volume_type),
        None => format!("{} (writable)", info.volume_type),
    };
    let rows = [
        ("Magic", info.magic.to_string()),
        ("Volume", volume),
        ("Display Name", info.display_name.clone()),
        ("Title Name", info.title_name.clone()),
        ("Publisher", info.publisher.clone()),
        ("Description", info.description.clone()),
        ("Title ID", format!("{:08X}", info.title_id)),
        ("Media ID", format!("{:08X}", info.media_id)),
        ("Version", format!("{:08X}", info.version)),
        ("Content Type", format!("0x{:08X}", info.content_type)),
        (
            "Fragments",
            format!(
                "{} of {} declared ({})",
                info.fragment_count,
                info.data_file_count,
                format_bytes(info.mapped_size)
            ),
        ),
        ("Files", info.file_count.to_string()),
        ("Directories", info.directory_count.to_string()),
        ("Content Size", format_bytes(info.content_size)),
    ];
    for (field, value) in rows {
        if value.is_empty() {
            continue;
        }
        table.add_row(vec![regular_cell(field), regular_cell(&value)]);
    }
    println!("{table}");

    Ok(())
}
