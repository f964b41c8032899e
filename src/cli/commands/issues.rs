//! `fixit issues ...`.

use std::io::IsTerminal;

use super::{ClientContext, print_json};
use crate::cli::{CreateArgs, IssuesCommand, ListArgs};
use crate::client::{ClientFilters, ClientIssue, ClientStatus, ImageFile, IssueList, NewIssueForm};
use crate::error::Result;
use crate::format::{TextFormatOptions, format_issue_details, format_issue_line_with, terminal_width};

/// Dispatch an `issues` subcommand.
///
/// # Errors
///
/// Bad input, network failures, or whatever the server rejects.
pub async fn execute(ctx: &mut ClientContext, command: IssuesCommand) -> Result<()> {
    let mut list = IssueList::new();
    match command {
        IssuesCommand::Create(args) => create(ctx, &mut list, args).await,
        IssuesCommand::Mine(args) => {
            list.set_filters(filters(&args)?);
            let issues = list.fetch_my_issues(&ctx.api, &mut ctx.session).await?;
            print_list(ctx, issues)
        }
        IssuesCommand::All(args) => {
            list.set_filters(filters(&args)?);
            let issues = list.fetch_all_issues(&ctx.api, &mut ctx.session).await?;
            print_list(ctx, issues)
        }
        IssuesCommand::Show { id } => {
            let issue = list.fetch_issue(&ctx.api, &mut ctx.session, &id).await?;
            print_one(ctx, &issue)
        }
        IssuesCommand::Status { id, status } => {
            let status: ClientStatus = status.parse()?;
            let issue = list
                .update_status(&ctx.api, &mut ctx.session, &id, status)
                .await?;
            print_one(ctx, &issue)
        }
        IssuesCommand::Remarks { id, remarks } => {
            let issue = list
                .update_remarks(&ctx.api, &mut ctx.session, &id, &remarks)
                .await?;
            print_one(ctx, &issue)
        }
    }
}

fn filters(args: &ListArgs) -> Result<ClientFilters> {
    let status = match args.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse()?),
    };
    Ok(ClientFilters {
        status,
        category: args.category.clone(),
    })
}

async fn create(ctx: &mut ClientContext, list: &mut IssueList, args: CreateArgs) -> Result<()> {
    let image = args
        .image
        .as_deref()
        .map(ImageFile::from_path)
        .transpose()?;
    let form = NewIssueForm {
        title: args.title,
        description: args.description,
        category: args.category,
        image,
    };
    let issue = list.create_issue(&ctx.api, &mut ctx.session, form).await?;
    if ctx.output.json {
        return print_json(&issue);
    }
    ctx.output.say(format!("Reported issue {}", issue.id));
    Ok(())
}

fn print_list(ctx: &ClientContext, issues: &[ClientIssue]) -> Result<()> {
    if ctx.output.json {
        return print_json(issues);
    }
    if issues.is_empty() {
        ctx.output.say("No issues found.");
        return Ok(());
    }
    let options = TextFormatOptions {
        use_color: ctx.output.use_color,
        max_width: std::io::stdout().is_terminal().then(terminal_width),
    };
    for issue in issues {
        ctx.output.say(format_issue_line_with(issue, options));
    }
    Ok(())
}

fn print_one(ctx: &ClientContext, issue: &ClientIssue) -> Result<()> {
    if ctx.output.json {
        return print_json(issue);
    }
    ctx.output
        .say(format_issue_details(issue, ctx.output.use_color).trim_end());
    Ok(())
}
