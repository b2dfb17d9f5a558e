//! Remote process command construction.
//!
//! Commands are pure functions of role and resolved addresses — no
//! inheritance, no ambient state. A worker command cannot be built
//! without the scheduler's internal address, which is what forces the
//! scheduler-first provisioning order.

/// Invocation for the scheduler process, listening on `control_port`.
pub fn scheduler_command(control_port: u16, extra_args: &[String]) -> Vec<String> {
    let mut command = vec![
        "skylift-scheduler".to_string(),
        "--port".to_string(),
        control_port.to_string(),
    ];
    command.extend(extra_args.iter().cloned());
    command
}

/// Invocation for a worker process connecting to `scheduler_address`.
///
/// The scheduler address is embedded verbatim.
pub fn worker_command(scheduler_address: &str, extra_args: &[String]) -> Vec<String> {
    let mut command = vec![
        "skylift-worker".to_string(),
        scheduler_address.to_string(),
    ];
    command.extend(extra_args.iter().cloned());
    command
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_command_carries_port() {
        let command = scheduler_command(8786, &[]);
        assert_eq!(command[0], "skylift-scheduler");
        assert!(command.contains(&"8786".to_string()));
    }

    #[test]
    fn worker_command_embeds_scheduler_address_verbatim() {
        let command = worker_command("10.0.0.1:8786", &[]);
        assert_eq!(command, vec!["skylift-worker", "10.0.0.1:8786"]);
    }

    #[test]
    fn extra_args_are_appended() {
        let extra = vec!["--nthreads".to_string(), "4".to_string()];
        let command = worker_command("10.0.0.1:8786", &extra);
        assert_eq!(command[2..], extra[..]);

        let command = scheduler_command(8786, &extra);
        assert_eq!(command[3..], extra[..]);
    }
}
