use clap::Parser;

use labhost_core::{ExecRequest, HostResult};

use super::Console;

/// Send the task server a request to execute a command.
#[derive(Parser, Debug)]
#[command(name = "request", disable_help_flag = true)]
pub struct RequestArgs {
    /// The cluster to which the request is submitted.
    #[arg(long, required = true)]
    pub cluster: String,

    /// The target device to run the command.
    #[arg(long = "run-target", required = true)]
    pub run_target: String,

    /// The name of the user submitting the request.
    #[arg(long, required = true)]
    pub user: String,

    /// The command to be executed, including any of its own flags.
    #[arg(
        value_name = "COMMAND",
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

pub async fn run(console: &Console, args: RequestArgs) -> HostResult<()> {
    let request = ExecRequest {
        cluster: args.cluster,
        run_target: args.run_target,
        user: args.user,
        command_line: args.command.join(" "),
    };
    console.tasks.new_request(&request).await
}
