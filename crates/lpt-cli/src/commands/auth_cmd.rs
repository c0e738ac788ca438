use lpt_core::auth::Account;

use crate::commands::common::CliContext;
use crate::error::CliError;

pub fn run_login(context: &CliContext, email: &str, pantry_id: &str) -> Result<(), CliError> {
    let account = Account::from_login(email, pantry_id)?;
    let mut state = context.load_state()?;
    println!("Logged in as {} (user id {})", account.email, account.user_id);
    state.account = Some(account);
    context.save_state(&state)
}

pub fn run_logout(context: &CliContext) -> Result<(), CliError> {
    let mut state = context.load_state()?;
    match state.account.take() {
        Some(account) => {
            context.save_state(&state)?;
            println!("Logged out {}", account.email);
        }
        None => println!("Not logged in."),
    }
    Ok(())
}
