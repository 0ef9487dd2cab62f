use std::sync::Arc;

use tonic::{Request, Response, Status};

use paygate_common::error::ServiceError;
use paygate_common::requests::{
    CardStatsKind, CardStatsQuery, CreateCardRequest, StatsGrain, UpdateCardRequest,
};
use paygate_services::{CardCommandService, CardQueryService, CardStatsService};

use super::convert;
use super::pb;
use super::pb::card_command_server::CardCommand;
use super::pb::card_query_server::CardQuery;
use super::pb::card_stats_server::CardStats;

pub struct CardQueryRpc {
    service: Arc<CardQueryService>,
}

impl CardQueryRpc {
    pub fn new(service: Arc<CardQueryService>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl CardQuery for CardQueryRpc {
    async fn find_all(
        &self,
        request: Request<pb::Pagination>,
    ) -> Result<Response<pb::CardListReply>, Status> {
        let filter = convert::pagination(Some(request.into_inner()));
        let page = self.service.find_all(filter).await?;
        Ok(Response::new(convert::card_list(page)))
    }

    async fn find_by_id(
        &self,
        request: Request<pb::IdRequest>,
    ) -> Result<Response<pb::CardReply>, Status> {
        let card = self.service.find_by_id(request.into_inner().id).await?;
        Ok(Response::new(pb::CardReply {
            card: Some(convert::card(&card)),
        }))
    }

    async fn find_by_card_number(
        &self,
        request: Request<pb::CardNumberRequest>,
    ) -> Result<Response<pb::CardReply>, Status> {
        let card = self
            .service
            .find_by_card_number(request.into_inner().card_number)
            .await?;
        Ok(Response::new(pb::CardReply {
            card: Some(convert::card(&card)),
        }))
    }

    async fn find_by_user(
        &self,
        request: Request<pb::UserIdPageRequest>,
    ) -> Result<Response<pb::CardListReply>, Status> {
        let req = request.into_inner();
        let filter = convert::pagination(req.filter);
        let page = self.service.find_by_user(req.user_id, filter).await?;
        Ok(Response::new(convert::card_list(page)))
    }

    async fn find_by_active(
        &self,
        request: Request<pb::Pagination>,
    ) -> Result<Response<pb::CardListReply>, Status> {
        let filter = convert::pagination(Some(request.into_inner()));
        let page = self.service.find_by_active(filter).await?;
        Ok(Response::new(convert::card_list(page)))
    }

    async fn find_by_trashed(
        &self,
        request: Request<pb::Pagination>,
    ) -> Result<Response<pb::CardListReply>, Status> {
        let filter = convert::pagination(Some(request.into_inner()));
        let page = self.service.find_by_trashed(filter).await?;
        Ok(Response::new(convert::card_list(page)))
    }
}

pub struct CardCommandRpc {
    service: Arc<CardCommandService>,
}

impl CardCommandRpc {
    pub fn new(service: Arc<CardCommandService>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl CardCommand for CardCommandRpc {
    async fn create(
        &self,
        request: Request<pb::CreateCardRequest>,
    ) -> Result<Response<pb::CardReply>, Status> {
        let req = request.into_inner();
        let card = self
            .service
            .create(CreateCardRequest {
                user_id: req.user_id,
                card_type: req.card_type,
                card_provider: req.card_provider,
                expire_date: req.expire_date,
                cvv: req.cvv,
            })
            .await?;
        Ok(Response::new(pb::CardReply {
            card: Some(convert::card(&card)),
        }))
    }

    async fn update(
        &self,
        request: Request<pb::UpdateCardRequest>,
    ) -> Result<Response<pb::CardReply>, Status> {
        let req = request.into_inner();
        let card = self
            .service
            .update(UpdateCardRequest {
                id: req.id,
                card_type: req.card_type,
                card_provider: req.card_provider,
                expire_date: req.expire_date,
                cvv: req.cvv,
            })
            .await?;
        Ok(Response::new(pb::CardReply {
            card: Some(convert::card(&card)),
        }))
    }

    async fn trashed(
        &self,
        request: Request<pb::IdRequest>,
    ) -> Result<Response<pb::CardReply>, Status> {
        let card = self.service.trashed(request.into_inner().id).await?;
        Ok(Response::new(pb::CardReply {
            card: Some(convert::card(&card)),
        }))
    }

    async fn restore(
        &self,
        request: Request<pb::IdRequest>,
    ) -> Result<Response<pb::CardReply>, Status> {
        let card = self.service.restore(request.into_inner().id).await?;
        Ok(Response::new(pb::CardReply {
            card: Some(convert::card(&card)),
        }))
    }

    async fn delete_permanent(
        &self,
        request: Request<pb::IdRequest>,
    ) -> Result<Response<pb::Empty>, Status> {
        self.service.delete_permanent(request.into_inner().id).await?;
        Ok(Response::new(pb::Empty {}))
    }

    async fn restore_all(
        &self,
        _request: Request<pb::Empty>,
    ) -> Result<Response<pb::AffectedReply>, Status> {
        let affected = self.service.restore_all().await?;
        Ok(Response::new(pb::AffectedReply { affected }))
    }

    async fn delete_all_permanent(
        &self,
        _request: Request<pb::Empty>,
    ) -> Result<Response<pb::AffectedReply>, Status> {
        let affected = self.service.delete_all_permanent().await?;
        Ok(Response::new(pb::AffectedReply { affected }))
    }
}

pub struct CardStatsRpc {
    service: Arc<CardStatsService>,
}

impl CardStatsRpc {
    pub fn new(service: Arc<CardStatsService>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl CardStats for CardStatsRpc {
    async fn get_stats(
        &self,
        request: Request<pb::CardStatsRequest>,
    ) -> Result<Response<pb::StatsReply>, Status> {
        let req = request.into_inner();
        let kind = CardStatsKind::parse(&req.kind).map_err(Status::from)?;
        let grain = StatsGrain::parse(&req.grain).map_err(Status::from)?;
        if req.year == 0 {
            return Err(ServiceError::invalid_field("year is required").into());
        }
        let series = self
            .service
            .get_stats(CardStatsQuery {
                kind,
                grain,
                year: req.year,
                card_number: (!req.card_number.is_empty()).then_some(req.card_number),
            })
            .await?;
        Ok(Response::new(convert::stats_reply(series)))
    }

    async fn get_dashboard(
        &self,
        request: Request<pb::DashboardRequest>,
    ) -> Result<Response<pb::DashboardReply>, Status> {
        let req = request.into_inner();
        let dashboard = self
            .service
            .dashboard((!req.card_number.is_empty()).then_some(req.card_number))
            .await?;
        Ok(Response::new(pb::DashboardReply {
            total_balance: dashboard.total_balance,
            total_topup: dashboard.total_topup,
            total_withdraw: dashboard.total_withdraw,
            total_transaction: dashboard.total_transaction,
            total_transfer: dashboard.total_transfer,
            total_transfer_sent: dashboard.total_transfer_sent,
            total_transfer_received: dashboard.total_transfer_received,
        }))
    }
}
