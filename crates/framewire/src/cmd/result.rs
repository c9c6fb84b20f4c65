use framewire::protocol::Client;
use framewire::source::{ResultBody, ResultsSink};

use crate::cmd::ResultArgs;
use crate::exit::{frame_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_status, OutputFormat};

pub fn run(args: ResultArgs, format: OutputFormat) -> CliResult<i32> {
    let body = parse_body(&args.json)?;
    let config = args.connect.client_config()?;
    let mut client = Client::connect(&config).map_err(|err| frame_error("connect failed", err))?;
    client
        .send(&body)
        .map_err(|err| frame_error("result request failed", err))?;
    print_status("result", None, format);
    Ok(SUCCESS)
}

fn parse_body(json: &str) -> CliResult<ResultBody> {
    match serde_json::from_str(json) {
        Ok(serde_json::Value::Object(body)) => Ok(body),
        Ok(_) => Err(CliError::new(DATA_INVALID, "result body must be a JSON object")),
        Err(err) => Err(CliError::new(DATA_INVALID, format!("invalid JSON: {err}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_must_be_an_object() {
        assert_eq!(parse_body(r#"{"status":"success"}"#).unwrap()["status"], "success");
        assert_eq!(parse_body("[1,2]").unwrap_err().code, DATA_INVALID);
        assert_eq!(parse_body("{").unwrap_err().code, DATA_INVALID);
    }
}
