use anyhow::{Result, bail};
use std::io::{self, BufRead, IsTerminal};
use zeroize::Zeroizing;

/// Reads the candidate passphrase.
///
/// Sources, in order: the `PWDFILE_PASSWORD` environment variable, piped
/// stdin, then an interactive prompt. The passphrase is zeroized on drop and
/// never echoed.
pub fn read_passphrase() -> Result<Zeroizing<String>> {
    //  PWDFILE_PASSWORD="secret" pwdfile check alice
    if let Ok(pw) = std::env::var("PWDFILE_PASSWORD") {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    //  printf '%s' "$pw" | pwdfile check alice
    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().lock().read_line(&mut buf)?;
        trim_newline(&mut buf);

        if !buf.is_empty() {
            return Ok(buf);
        }
    }

    if io::stdin().is_terminal() {
        let pw = rpassword::prompt_password("Password: ")?;
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    bail!("no passphrase provided")
}

fn trim_newline(s: &mut String) {
    while s.ends_with('\n') || s.ends_with('\r') {
        s.pop();
    }
}
