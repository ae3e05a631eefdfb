//! Table rendering for `list` and `lease` output.

use comfy_table::{presets::UTF8_FULL, Cell, Table};

use labhost_core::{CommandTask, DeviceInfo, Host};

pub fn host_table(hosts: &[Host]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["index", "name"]);
    for (index, host) in hosts.iter().enumerate() {
        table.add_row(vec![Cell::new(index), Cell::new(host.hostname())]);
    }
    table
}

pub fn device_table(devices: &[DeviceInfo]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        "device_serial",
        "state",
        "run_target",
        "build_id",
        "sdk_version",
        "stub",
    ]);
    for device in devices {
        table.add_row(vec![
            Cell::new(&device.device_serial),
            Cell::new(&device.state),
            Cell::new(&device.run_target),
            Cell::new(&device.build_id),
            Cell::new(&device.sdk_version),
            Cell::new(device.stub),
        ]);
    }
    table
}

pub fn task_table(tasks: &[CommandTask]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        "request_id",
        "command_id",
        "task_id",
        "device_serials",
        "command_line",
    ]);
    for task in tasks {
        table.add_row(vec![
            Cell::new(&task.request_id),
            Cell::new(&task.command_id),
            Cell::new(&task.task_id),
            Cell::new(task.device_serials.join(",")),
            Cell::new(&task.command_line),
        ]);
    }
    table
}
