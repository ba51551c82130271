use clap::Subcommand;

use crate::api::{FeedQuery, ProjectQuery};
use crate::comments::CommentThread;
use crate::error::{ClientError, ClientResult};
use crate::forms::{CommunityForm, LoginForm, PostForm, ProjectForm, RegisterForm};
use crate::models::{PostType, ProjectStatus, TimeRange, VoteDirection};
use crate::navigation::Route;
use crate::render;
use crate::state::AppState;
use crate::votes::Subject;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in and store the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long = "confirm")]
        password_confirm: String,
    },
    /// Sign out and forget stored tokens
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Browse and manage communities
    Communities {
        #[command(subcommand)]
        action: CommunityCommand,
    },
    /// Community posts
    Posts {
        #[command(subcommand)]
        action: PostCommand,
    },
    /// Project proposals
    Projects {
        #[command(subcommand)]
        action: ProjectCommand,
    },
    /// Latest and top posts across communities
    Feed {
        #[command(subcommand)]
        action: FeedCommand,
    },
    /// Threaded discussion on a post
    Comments {
        #[command(subcommand)]
        action: CommentCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum CommunityCommand {
    List {
        #[arg(long, default_value_t = 1)]
        page: u64,
        #[arg(long, default_value_t = 20)]
        per_page: u64,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Community details together with its posts
    Show {
        slug: String,
        #[arg(long = "type", value_enum)]
        post_type: Option<PostType>,
    },
    Join {
        slug: String,
    },
    Leave {
        slug: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum PostCommand {
    List {
        slug: String,
        #[arg(long = "type", value_enum)]
        post_type: Option<PostType>,
    },
    Create {
        slug: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        content: String,
        #[arg(long = "type", value_enum, default_value_t = PostType::Discussion)]
        post_type: PostType,
    },
    Show {
        id: String,
    },
    Vote {
        id: String,
        #[arg(value_enum)]
        direction: VoteDirection,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    List {
        #[arg(long, default_value_t = 1)]
        page: u64,
        #[arg(long, default_value_t = 20)]
        per_page: u64,
        #[arg(long)]
        status: Option<ProjectStatus>,
        #[arg(long)]
        community: Option<String>,
    },
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        community: Option<String>,
    },
    Show {
        id: String,
    },
    Update {
        id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
    },
    Delete {
        id: String,
    },
    Vote {
        id: String,
        #[arg(value_enum)]
        direction: VoteDirection,
    },
    /// Move a project to a new status
    Transition {
        id: String,
        status: ProjectStatus,
    },
}

#[derive(Subcommand, Debug)]
pub enum FeedCommand {
    Latest {
        #[arg(long, default_value_t = 1)]
        page: u64,
        #[arg(long, default_value_t = 20)]
        per_page: u64,
    },
    Top {
        #[arg(long, value_enum, default_value_t = TimeRange::Week)]
        range: TimeRange,
        #[arg(long, default_value_t = 1)]
        page: u64,
        #[arg(long, default_value_t = 20)]
        per_page: u64,
    },
}

#[derive(Subcommand, Debug)]
pub enum CommentCommand {
    Show {
        post_id: String,
    },
    Add {
        post_id: String,
        content: String,
    },
    Reply {
        post_id: String,
        parent_id: String,
        content: String,
    },
    Delete {
        post_id: String,
        comment_id: String,
    },
}

impl Command {
    /// The page this command corresponds to.
    pub fn route(&self) -> Route {
        match self {
            Command::Login { .. } => Route::Login,
            Command::Register { .. } => Route::Register,
            Command::Logout => Route::Home,
            Command::Whoami => Route::Dashboard,
            Command::Communities { action } => match action {
                CommunityCommand::List { .. } | CommunityCommand::Create { .. } => {
                    Route::Communities
                }
                CommunityCommand::Show { slug, .. }
                | CommunityCommand::Join { slug }
                | CommunityCommand::Leave { slug } => Route::Community(slug.clone()),
            },
            Command::Posts { action } => match action {
                PostCommand::List { slug, .. } | PostCommand::Create { slug, .. } => {
                    Route::Community(slug.clone())
                }
                PostCommand::Show { id } | PostCommand::Vote { id, .. } => Route::Post(id.clone()),
            },
            Command::Projects { action } => match action {
                ProjectCommand::List { .. } | ProjectCommand::Create { .. } => Route::Projects,
                ProjectCommand::Show { id }
                | ProjectCommand::Update { id, .. }
                | ProjectCommand::Delete { id }
                | ProjectCommand::Vote { id, .. }
                | ProjectCommand::Transition { id, .. } => Route::Project(id.clone()),
            },
            Command::Feed { .. } => Route::Feed,
            Command::Comments { action } => match action {
                CommentCommand::Show { post_id }
                | CommentCommand::Add { post_id, .. }
                | CommentCommand::Reply { post_id, .. }
                | CommentCommand::Delete { post_id, .. } => Route::Post(post_id.clone()),
            },
        }
    }
}

/// Execute a command against an initialised session.
pub async fn run(state: &AppState, command: Command) -> ClientResult<String> {
    let route = command.route();
    if route.is_auth_route() || !route.is_protected() {
        state.router.redirect(route);
    } else if state.router.visit(route, &state.session) == Route::Login {
        return Err(ClientError::Unauthorized);
    }

    match command {
        Command::Login { email, password } => {
            let user = state
                .sessions()
                .login(&LoginForm { email, password })
                .await?;
            Ok(format!("Signed in as {}", user.username))
        }
        Command::Register {
            username,
            email,
            password,
            password_confirm,
        } => {
            state
                .sessions()
                .register(&RegisterForm {
                    username,
                    email,
                    password,
                    password_confirm,
                })
                .await?;
            Ok("Account created. Sign in with `agora login`.".to_string())
        }
        Command::Logout => {
            state.sessions().logout();
            Ok("Signed out.".to_string())
        }
        Command::Whoami => {
            let user = state
                .session
                .current_user()
                .ok_or(ClientError::Unauthorized)?;
            let mut out = render::user_line(&user);
            let pending = state.votes.cache().unconfirmed()?;
            if !pending.is_empty() {
                out.push_str(&format!(
                    "\n{} vote(s) not yet confirmed by the server",
                    pending.len()
                ));
            }
            Ok(out)
        }
        Command::Communities { action } => communities(state, action).await,
        Command::Posts { action } => posts(state, action).await,
        Command::Projects { action } => projects(state, action).await,
        Command::Feed { action } => feed(state, action).await,
        Command::Comments { action } => comments(state, action).await,
    }
}

async fn communities(state: &AppState, action: CommunityCommand) -> ClientResult<String> {
    let api = &state.api;
    match action {
        CommunityCommand::List { page, per_page } => {
            let page = api.list_communities(page, per_page).await?;
            Ok(render::page(&page, render::community_card, "No communities yet."))
        }
        CommunityCommand::Create { name, description } => {
            let form = CommunityForm { name, description };
            form.validate()?;
            let community = api.create_community(&form).await?;
            Ok(render::community_card(&community))
        }
        CommunityCommand::Show { slug, post_type } => {
            let (community, mut posts) = tokio::try_join!(
                api.get_community(&slug),
                api.community_posts(&slug, post_type)
            )?;
            for post in &mut posts.items {
                state.votes.observe_post(post);
            }
            Ok(format!(
                "{}\n\n{}",
                render::community_card(&community),
                render::page(&posts, render::post_card, "No posts yet.")
            ))
        }
        CommunityCommand::Join { slug } => {
            api.join_community(&slug).await?;
            Ok(format!("Joined {slug}."))
        }
        CommunityCommand::Leave { slug } => {
            api.leave_community(&slug).await?;
            Ok(format!("Left {slug}."))
        }
    }
}

async fn posts(state: &AppState, action: PostCommand) -> ClientResult<String> {
    let api = &state.api;
    match action {
        PostCommand::List { slug, post_type } => {
            let mut page = api.community_posts(&slug, post_type).await?;
            for post in &mut page.items {
                state.votes.observe_post(post);
            }
            Ok(render::page(&page, render::post_card, "No posts yet."))
        }
        PostCommand::Create {
            slug,
            title,
            content,
            post_type,
        } => {
            let form = PostForm {
                title,
                content,
                post_type,
            };
            form.validate()?;
            let post = api.create_post(&slug, &form).await?;
            Ok(render::post_card(&post))
        }
        PostCommand::Show { id } => {
            let mut post = api.get_post(&id).await?;
            state.votes.observe_post(&mut post);
            Ok(render::post_detail(&post))
        }
        PostCommand::Vote { id, direction } => {
            let mut post = api.get_post(&id).await?;
            state.votes.observe_post(&mut post);
            let tally = state
                .votes
                .vote(api.as_ref(), &Subject::post(&id), direction)
                .await?;
            Ok(format!("{}  {}", render::tally_line(&tally), post.title))
        }
    }
}

async fn projects(state: &AppState, action: ProjectCommand) -> ClientResult<String> {
    let api = &state.api;
    match action {
        ProjectCommand::List {
            page,
            per_page,
            status,
            community,
        } => {
            let query = ProjectQuery {
                page,
                per_page,
                status,
                community,
            };
            let mut page = api.list_projects(&query).await?;
            for project in &mut page.items {
                state.votes.observe_project(project);
            }
            Ok(render::page(&page, render::project_card, "No projects yet."))
        }
        ProjectCommand::Create {
            title,
            description,
            community,
        } => {
            let form = ProjectForm {
                title,
                description,
                community,
            };
            form.validate()?;
            let project = api.create_project(&form).await?;
            Ok(render::project_card(&project))
        }
        ProjectCommand::Show { id } => {
            let mut project = api.get_project(&id).await?;
            state.votes.observe_project(&mut project);
            Ok(render::project_detail(&project))
        }
        ProjectCommand::Update {
            id,
            title,
            description,
        } => {
            let form = ProjectForm {
                title,
                description,
                community: None,
            };
            form.validate()?;
            let project = api.update_project(&id, &form).await?;
            Ok(render::project_card(&project))
        }
        ProjectCommand::Delete { id } => {
            api.delete_project(&id).await?;
            state.router.redirect(Route::Projects);
            Ok(format!("Deleted project #{id}."))
        }
        ProjectCommand::Vote { id, direction } => {
            let mut project = api.get_project(&id).await?;
            state.votes.observe_project(&mut project);
            let tally = state
                .votes
                .vote(api.as_ref(), &Subject::project(&id), direction)
                .await?;
            Ok(format!("{}  {}", render::tally_line(&tally), project.title))
        }
        ProjectCommand::Transition { id, status } => {
            let project = api.transition_project(&id, &status).await?;
            Ok(render::project_card(&project))
        }
    }
}

async fn feed(state: &AppState, action: FeedCommand) -> ClientResult<String> {
    let api = &state.api;
    let mut page = match action {
        FeedCommand::Latest { page, per_page } => {
            api.latest_feed(&FeedQuery { page, per_page }).await?
        }
        FeedCommand::Top {
            range,
            page,
            per_page,
        } => api.top_feed(range, &FeedQuery { page, per_page }).await?,
    };
    for post in &mut page.items {
        state.votes.observe_post(post);
    }
    Ok(render::page(&page, render::post_card, "Nothing in the feed yet."))
}

async fn comments(state: &AppState, action: CommentCommand) -> ClientResult<String> {
    let author = state.session.current_user().map(|u| u.username);
    let source = state.api.as_ref();
    match action {
        CommentCommand::Show { post_id } => {
            let thread = CommentThread::load(source, &post_id, author).await?;
            Ok(render::comment_tree(thread.tree()))
        }
        CommentCommand::Add { post_id, content } => {
            let mut thread = CommentThread::load(source, &post_id, author).await?;
            thread.create_root(&content).await?;
            Ok(render::comment_tree(thread.tree()))
        }
        CommentCommand::Reply {
            post_id,
            parent_id,
            content,
        } => {
            let mut thread = CommentThread::load(source, &post_id, author).await?;
            thread.reply(&parent_id, &content).await?;
            Ok(render::comment_tree(thread.tree()))
        }
        CommentCommand::Delete {
            post_id,
            comment_id,
        } => {
            let mut thread = CommentThread::load(source, &post_id, author).await?;
            let removed = thread.delete(&comment_id).await?;
            Ok(format!(
                "Deleted {} comment(s).\n\n{}",
                removed,
                render::comment_tree(thread.tree())
            ))
        }
    }
}
