//! Shopsync CLI - Drive the cart/wishlist sync layer from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Add two units of a product to an anonymous cart (memory only)
//! shopsync cart add 5 --name "Green Tea" --price 9.99 --quantity 2
//!
//! # Add to a signed-in user's cart (backend when configured, else local)
//! shopsync --user u1 cart add 5 --name "Green Tea" --price 9.99
//!
//! # Show the session wishlist
//! shopsync --user u1 wishlist show
//!
//! # Create a named wishlist on the backend
//! shopsync --user u1 lists create "Birthday ideas"
//! ```
//!
//! # Commands
//!
//! - `cart` - Show and change the cart
//! - `wishlist` - Show and change the session wishlist
//! - `lists` - Manage named wishlists on the backend

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;

use shopsync::SyncConfig;
use shopsync::telemetry::{init_sentry, init_tracing};

mod commands;

#[derive(Parser)]
#[command(name = "shopsync")]
#[command(author, version, about = "Cart and wishlist sync tools")]
struct Cli {
    /// Sign in as this user before running the command
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Email of the signed-in user (defaults to `<user>@localhost`)
    #[arg(long, global = true, requires = "user")]
    email: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Show and change the session wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// Manage named wishlists on the backend
    Lists {
        #[command(subcommand)]
        action: ListsAction,
    },
}

/// Product fields needed to put a product in the cart or wishlist.
#[derive(Args)]
struct ProductArgs {
    /// Product ID
    id: i64,

    /// Product name
    #[arg(short, long)]
    name: String,

    /// Unit price
    #[arg(short, long)]
    price: Decimal,

    /// Price before discount
    #[arg(long)]
    original_price: Option<Decimal>,
}

#[derive(Subcommand)]
enum CartAction {
    /// Print the cart
    Show,
    /// Add units of a product
    Add {
        #[command(flatten)]
        product: ProductArgs,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a product's line
    Remove {
        /// Product ID
        id: i64,
    },
    /// Set a line's quantity (0 or less removes it)
    Update {
        /// Product ID
        id: i64,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum WishlistAction {
    /// Print the session wishlist
    Show,
    /// Save a product
    Add {
        #[command(flatten)]
        product: ProductArgs,
    },
    /// Remove a product
    Remove {
        /// Product ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum ListsAction {
    /// Print every named wishlist
    Show,
    /// Create a named wishlist
    Create {
        /// Wishlist name (at most 50 characters)
        name: String,
    },
    /// Add a product to a named wishlist
    Add {
        /// Wishlist ID
        wishlist: String,

        /// Product ID
        product: i64,
    },
    /// Remove a product from a named wishlist
    Remove {
        /// Wishlist ID
        wishlist: String,

        /// Product ID
        product: i64,
    },
    /// Delete a named wishlist
    Delete {
        /// Wishlist ID
        wishlist: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = SyncConfig::from_env()?;

    // Keep the guard alive until the command finishes
    let _sentry_guard = init_sentry(&config);
    init_tracing(cli.json_logs);

    let session = commands::Session::open(&config, cli.user, cli.email).await?;

    match cli.command {
        Commands::Cart { action } => match action {
            CartAction::Show => {}
            CartAction::Add { product, quantity } => {
                commands::cart::add(&session, product.into_product(), quantity).await;
            }
            CartAction::Remove { id } => commands::cart::remove(&session, id).await,
            CartAction::Update { id, quantity } => {
                commands::cart::update(&session, id, quantity).await;
            }
            CartAction::Clear => commands::cart::clear(&session).await,
        },
        Commands::Wishlist { action } => match action {
            WishlistAction::Show => {}
            WishlistAction::Add { product } => {
                commands::wishlist::add(&session, product.into_product());
            }
            WishlistAction::Remove { id } => commands::wishlist::remove(&session, id),
        },
        Commands::Lists { action } => {
            match action {
                ListsAction::Show => {}
                ListsAction::Create { name } => commands::lists::create(&session, &name).await?,
                ListsAction::Add { wishlist, product } => {
                    commands::lists::add(&session, &wishlist, product).await?;
                }
                ListsAction::Remove { wishlist, product } => {
                    commands::lists::remove(&session, &wishlist, product).await?;
                }
                ListsAction::Delete { wishlist } => {
                    commands::lists::delete(&session, &wishlist).await?;
                }
            }
            return commands::lists::show(&session).await;
        }
    }

    commands::print_state(&session);
    Ok(())
}

impl ProductArgs {
    fn into_product(self) -> shopsync_core::Product {
        let mut product = shopsync_core::Product::new(
            shopsync_core::ProductId::new(self.id),
            self.name,
            self.price,
        );
        product.original_price = self.original_price;
        product
    }
}
